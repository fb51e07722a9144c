//! Helper constructors and predicates for generated watch messages.

mod watch_ext;
