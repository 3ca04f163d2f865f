//! Custom (non-native) dropdown detection.
//!
//! Modern ATS forms render selects as styled widgets. Detection is an
//! ordered list of independent heuristics, first match wins; each is a
//! plain predicate over the raw element snapshot so it can be tested in
//! isolation.

use crate::extractor::RawElement;

/// One named detection heuristic.
pub struct DropdownHeuristic {
    pub name: &'static str,
    pub matches: fn(&RawElement) -> bool,
}

/// Ordered heuristic ladder. Order matters: the first match names the
/// detection reason recorded in logs.
pub fn heuristics() -> &'static [DropdownHeuristic] {
    &[
        DropdownHeuristic {
            name: "role-attribute",
            matches: |el| matches!(el.role.as_str(), "combobox" | "listbox"),
        },
        DropdownHeuristic {
            name: "class-fragment",
            matches: |el| {
                let class = el.class_name.to_lowercase();
                ["select", "dropdown", "picker", "combobox"]
                    .iter()
                    .any(|frag| class.contains(frag))
            },
        },
        DropdownHeuristic {
            name: "placeholder-wording",
            matches: |el| {
                let placeholder = el.placeholder.to_lowercase();
                placeholder.contains("select") || placeholder.contains("choose")
            },
        },
        DropdownHeuristic {
            name: "readonly-click-handler",
            matches: |el| el.readonly && el.has_click_handler,
        },
    ]
}

/// Run the ladder over a candidate element. Returns the name of the first
/// heuristic that matched.
pub fn detect(el: &RawElement) -> Option<&'static str> {
    heuristics()
        .iter()
        .find(|h| (h.matches)(el))
        .map(|h| h.name)
}

/// Selectors that identify a revealed option menu, tried in order during
/// the reveal-read-close probe.
pub const MENU_PATTERNS: &[&str] = &[
    "[role='listbox']",
    "[role='menu']",
    ".select__menu",
    ".dropdown-menu",
    "[class*='menu'][class*='open']",
    "[class*='options']",
    "ul[class*='list']",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(tag: &str) -> RawElement {
        RawElement {
            tag: tag.to_string(),
            ..RawElement::default()
        }
    }

    #[test]
    fn test_role_attribute_wins_first() {
        let mut el = bare("div");
        el.role = "combobox".to_string();
        el.class_name = "fancy-select".to_string();
        assert_eq!(detect(&el), Some("role-attribute"));
    }

    #[test]
    fn test_class_fragment() {
        let mut el = bare("div");
        el.class_name = "Select-control".to_string();
        assert_eq!(detect(&el), Some("class-fragment"));

        let mut el = bare("div");
        el.class_name = "country-picker__trigger".to_string();
        assert_eq!(detect(&el), Some("class-fragment"));
    }

    #[test]
    fn test_placeholder_wording() {
        let mut el = bare("input");
        el.placeholder = "Choose an option".to_string();
        assert_eq!(detect(&el), Some("placeholder-wording"));
    }

    #[test]
    fn test_readonly_with_click_handler() {
        let mut el = bare("input");
        el.readonly = true;
        el.has_click_handler = true;
        assert_eq!(detect(&el), Some("readonly-click-handler"));
    }

    #[test]
    fn test_readonly_without_handler_is_not_a_dropdown() {
        let mut el = bare("input");
        el.readonly = true;
        assert_eq!(detect(&el), None);
    }

    #[test]
    fn test_plain_element_no_match() {
        assert_eq!(detect(&bare("div")), None);
    }

    #[test]
    fn test_each_heuristic_is_independent() {
        // A match on a later heuristic does not require earlier ones.
        let mut el = bare("div");
        el.placeholder = "Select your country".to_string();
        assert!(el.role.is_empty());
        assert!(el.class_name.is_empty());
        assert_eq!(detect(&el), Some("placeholder-wording"));
    }
}
