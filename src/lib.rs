//! Access to the consumption data published by Spanish utility customer portals.
//!
//! [`api`] talks to the i-DE electricity distribution portal, [`globalomnium`] to the Global
//! Omnium water portal and [`mock`] returns canned data without touching the network. All of them
//! implement [`Provider`].

pub mod api;
pub mod error;
pub mod globalomnium;
pub mod mock;
pub mod model;
pub mod provider;

pub use error::Error;
pub use provider::{Provider, ProviderId};

/// Collapse runs of blanks and capitalize every word of an address as returned by the portals.
pub fn sanitize_address(address: &str) -> String {
    address
        .split(' ')
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod test {
    #[test]
    fn sanitize_address() {
        assert_eq!(
            "C/ Mayor, 12 , 3 46001-valencia",
            super::sanitize_address("C/ MAYOR,  12 , 3 46001-VALENCIA      ")
        );
        assert_eq!("Avda. Del Puerto", super::sanitize_address("avda. DEL puerto"));
        assert_eq!("", super::sanitize_address("   "));
    }
}
