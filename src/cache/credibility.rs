//! How much cached data can be trusted.

use core::fmt;

//------------ Credibility ---------------------------------------------------

/// The trust level of cached data.
///
/// The level depends on where the data was found in a response and whether
/// the response was authoritative. Levels are totally ordered from lowest
/// to highest. Data in the cache is only ever replaced by data of equal or
/// higher credibility.
///
/// Glue and hints are ranked highest. They are only ever stored in the
/// cache of authoritative servers where they are the sole source of data.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
#[repr(u8)]
pub enum Credibility {
    /// The additional section of a non-authoritative response.
    NonAuthAdditional = 0,

    /// The answer section of a non-authoritative response.
    NonAuthAnswer = 1,

    /// The additional section of an authoritative response.
    Additional = 2,

    /// The authority section of a non-authoritative response.
    NonAuthAuthority = 3,

    /// The answer section of an authoritative response.
    AuthAnswer = 4,

    /// The authority section of an authoritative response.
    AuthAuthority = 5,

    /// Address records of name servers learned from a referral.
    Glue = 6,

    /// Name server records learned from a referral.
    Hint = 7,
}

impl Credibility {
    /// The credibility required for data to be used in an answer.
    pub const NORMAL: Credibility = Credibility::NonAuthAnswer;

    /// Returns the credibility of data from an answer section.
    #[must_use]
    pub fn answer(authoritative: bool) -> Self {
        if authoritative {
            Credibility::AuthAnswer
        } else {
            Credibility::NonAuthAnswer
        }
    }

    /// Returns the credibility of data from an authority section.
    #[must_use]
    pub fn authority(authoritative: bool) -> Self {
        if authoritative {
            Credibility::AuthAuthority
        } else {
            Credibility::NonAuthAuthority
        }
    }

    /// Returns the credibility of data from an additional section.
    #[must_use]
    pub fn additional(authoritative: bool) -> Self {
        if authoritative {
            Credibility::Additional
        } else {
            Credibility::NonAuthAdditional
        }
    }

    /// Returns the numeric level.
    #[must_use]
    pub fn to_int(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Credibility {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Credibility::NonAuthAdditional => "non-auth-additional",
            Credibility::NonAuthAnswer => "non-auth-answer",
            Credibility::Additional => "additional",
            Credibility::NonAuthAuthority => "non-auth-authority",
            Credibility::AuthAnswer => "auth-answer",
            Credibility::AuthAuthority => "auth-authority",
            Credibility::Glue => "glue",
            Credibility::Hint => "hint",
        })
    }
}

//============ Testing =======================================================
