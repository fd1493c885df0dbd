//! Regex patterns shared by the text matchers.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Anything that is not a letter, digit or underscore
    pub static ref NON_WORD: Regex = Regex::new(r"\W").unwrap();
}
