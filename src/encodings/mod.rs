// encodings/mod.rs - one submodule per character set the VM can search under.

pub mod ascii;
pub mod utf8;

pub use ascii::ONIG_ENCODING_ASCII;
pub use utf8::ONIG_ENCODING_UTF8;
