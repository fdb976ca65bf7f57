//! Per-pane address history.
//!
//! Each pane keeps its current address and a back stack of the addresses it
//! showed before. Going back pops the stack without pushing the address being
//! left, so repeated back navigation walks the stack down to empty.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use url::Url;

/// Address shown by a pane with nothing loaded.
pub const BLANK_ADDRESS: &str = "about:blank";

const KNOWN_TLDS: [&str; 8] = [".com", ".org", ".net", ".edu", ".gov", ".io", ".co", ".ai"];

const SEARCH_PREFIX: &str = "https://www.google.com/search?q=";

/// Back stack plus current address of one pane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationHistory {
    current: Option<String>,
    back: Vec<String>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History seeded with an initial address and an empty back stack.
    pub fn starting_at(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            current: (!address.is_empty()).then_some(address),
            back: Vec::new(),
        }
    }

    /// Currently shown address, `about:blank` when nothing is loaded.
    pub fn current(&self) -> &str {
        self.current.as_deref().unwrap_or(BLANK_ADDRESS)
    }

    /// Previously shown addresses, most recent last.
    pub fn back_stack(&self) -> &[String] {
        &self.back
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    /// Show a new address, remembering the current one unless it is blank.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::navigation::NavigationHistory;
    ///
    /// let mut history = NavigationHistory::new();
    /// history.navigate("https://a.com");
    /// history.navigate("https://b.com");
    /// assert_eq!(history.back_stack(), &["https://a.com".to_string()]);
    /// assert_eq!(history.go_back(), Some("https://a.com"));
    /// assert!(!history.can_go_back());
    /// ```
    pub fn navigate(&mut self, address: impl Into<String>) {
        if let Some(previous) = self.current.take() {
            if !previous.is_empty() && previous != BLANK_ADDRESS {
                self.back.push(previous);
            }
        }
        self.current = Some(address.into());
    }

    /// Return to the most recent previous address.
    pub fn go_back(&mut self) -> Option<&str> {
        let previous = self.back.pop()?;
        self.current = Some(previous);
        self.current.as_deref()
    }

    /// Forget the current address and the back stack.
    pub fn clear(&mut self) {
        self.current = None;
        self.back.clear();
    }
}

/// Turn address-bar input into a loadable address.
///
/// Blank input becomes `about:blank`. Input with a space, or that does not
/// look like an address, becomes a search. Address-like input without a
/// scheme gets `https://`.
///
/// # Example
///
/// ```rust
/// use splitgrid_core::navigation::normalize_address;
///
/// assert_eq!(normalize_address("  "), "about:blank");
/// assert_eq!(normalize_address("example.com"), "https://example.com");
/// assert_eq!(normalize_address("http://x.org/a"), "http://x.org/a");
/// assert_eq!(
///     normalize_address("rust grid"),
///     "https://www.google.com/search?q=rust%20grid&igu=1"
/// );
/// ```
pub fn normalize_address(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return BLANK_ADDRESS.to_string();
    }

    let looks_like_address = KNOWN_TLDS.iter().any(|tld| input.contains(tld))
        || input.starts_with("http://")
        || input.starts_with("https://")
        || input.starts_with("www.");

    if input.contains(' ') || !looks_like_address {
        return format!("{}{}&igu=1", SEARCH_PREFIX, encode_component(input));
    }

    if has_scheme(input) {
        input.to_string()
    } else {
        format!("https://{}", input)
    }
}

fn has_scheme(input: &str) -> bool {
    // `host:port` parses as a scheme too, so require the `://` separator
    Url::parse(input).is_ok_and(|url| input[url.scheme().len()..].starts_with("://"))
}

/// Bytes a browser's `encodeURIComponent` escapes.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_not_pushed() {
        let mut history = NavigationHistory::starting_at(BLANK_ADDRESS);
        history.navigate("https://a.com");
        assert!(!history.can_go_back());
        assert_eq!(history.current(), "https://a.com");
    }

    #[test]
    fn test_back_does_not_push_current() {
        let mut history = NavigationHistory::new();
        history.navigate("https://a.com");
        history.navigate("https://b.com");
        history.navigate("https://c.com");
        assert_eq!(history.go_back(), Some("https://b.com"));
        assert_eq!(history.go_back(), Some("https://a.com"));
        assert_eq!(history.go_back(), None);
        assert_eq!(history.current(), "https://a.com");
    }

    #[test]
    fn test_clear() {
        let mut history = NavigationHistory::starting_at("https://a.com");
        history.navigate("https://b.com");
        history.clear();
        assert_eq!(history.current(), BLANK_ADDRESS);
        assert!(history.back_stack().is_empty());
    }

    #[test]
    fn test_normalize_search_encoding() {
        assert_eq!(
            normalize_address("what is 1+1?"),
            "https://www.google.com/search?q=what%20is%201%2B1%3F&igu=1"
        );
        assert_eq!(
            normalize_address("localhost"),
            "https://www.google.com/search?q=localhost&igu=1"
        );
        assert_eq!(
            normalize_address("café (menu)*"),
            "https://www.google.com/search?q=caf%C3%A9%20(menu)*&igu=1"
        );
    }

    #[test]
    fn test_normalize_schemes() {
        assert_eq!(normalize_address("www.rust-lang.org"), "https://www.rust-lang.org");
        assert_eq!(normalize_address("ftp://files.net"), "ftp://files.net");
        assert_eq!(normalize_address("https://docs.rs"), "https://docs.rs");
        assert_eq!(normalize_address("example.com:8080/x"), "https://example.com:8080/x");
    }
}
