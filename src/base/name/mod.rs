//! Domain names.
//!
//! Domain names are a sequence of *labels* which are in turn a sequence of
//! up to 63 octets. In their wire-format representation labels are prefixed
//! with an octet containing the number of octets in the label. The labels
//! in a domain name are nominally arranged backwards. That is, the ‘most
//! significant’ label is the last one. In an *absolute* domain name, this
//! last label is an empty label, called the *root label*. Only absolute
//! names can appear inside DNS messages.
//!
//! All names are represented by the single type [`Name`] which knows
//! whether it is absolute or relative. Names appearing in messages may be
//! compressed by replacing a suffix with a pointer to an earlier occurence
//! of that suffix. A [`Compressor`] keeps track of these occurences while
//! composing a message.

pub use self::compress::Compressor;
pub use self::dname::{LabelIter, Name, NameError, SuffixIter};

mod compress;
mod dname;
