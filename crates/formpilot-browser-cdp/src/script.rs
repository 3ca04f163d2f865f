//! Injected JavaScript builders for page interactions.
//!
//! Every builder embeds its arguments as JSON string literals, so
//! arbitrary selectors and values cannot break out of the script.

use serde_json::Value;

/// Escape a string as a JavaScript string literal.
pub(crate) fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Click the first element matching the selector.
///
/// Returns `"ok"` or `"missing"`.
pub(crate) fn click_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return 'missing';
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return 'ok';
        }})()"#,
        sel = js_string(selector)
    )
}

/// Set an element's value and fire the events reactive frameworks
/// listen for.
///
/// Text-like inputs go through the prototype value setter so frameworks
/// that shadow `.value` (React's value tracking) still observe the
/// change. Checkboxes interpret the value as a boolean. Multi-selects
/// take a comma-joined value and toggle each option individually, since
/// assigning `.value` on a multiple select never matches a joined
/// string. Returns `"ok"` or `"missing"`.
pub(crate) fn set_value_script(selector: &str, value: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return 'missing';
            const value = {val};
            const tag = el.tagName.toLowerCase();
            if (el.type === 'checkbox') {{
                el.checked = value === 'true';
            }} else if (tag === 'select' && el.multiple) {{
                const wanted = value.split(',');
                for (const opt of el.options) {{
                    opt.selected = wanted.includes(opt.value);
                }}
            }} else {{
                const proto = tag === 'textarea' ? HTMLTextAreaElement.prototype
                    : tag === 'select' ? HTMLSelectElement.prototype
                    : HTMLInputElement.prototype;
                const desc = Object.getOwnPropertyDescriptor(proto, 'value');
                if (desc && desc.set) {{
                    desc.set.call(el, value);
                }} else {{
                    el.value = value;
                }}
            }}
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return 'ok';
        }})()"#,
        sel = js_string(selector),
        val = js_string(value)
    )
}

/// Probe whether the selector currently matches an element.
pub(crate) fn exists_script(selector: &str) -> String {
    format!(
        "document.querySelector({sel}) !== null",
        sel = js_string(selector)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes_and_newlines() {
        let escaped = js_string("input[name='a\"b']\n");
        assert_eq!(escaped, r#""input[name='a\"b']\n""#);
    }

    #[test]
    fn test_set_value_script_embeds_arguments_as_literals() {
        let script = set_value_script("[id='email']", "ada@example.com");
        assert!(script.contains(r#""[id='email']""#));
        assert!(script.contains(r#""ada@example.com""#));
        assert!(script.contains("dispatchEvent"));
    }

    #[test]
    fn test_set_value_script_toggles_multi_select_options() {
        let script = set_value_script("select[name='regions']", "US,DE");
        assert!(script.contains("el.multiple"));
        assert!(script.contains("value.split(',')"));
        assert!(script.contains("opt.selected = wanted.includes(opt.value)"));
    }

    #[test]
    fn test_click_script_reports_missing_element() {
        let script = click_script("#submit");
        assert!(script.contains("'missing'"));
        assert!(script.contains("scrollIntoView"));
    }

    #[test]
    fn test_exists_script_is_a_bare_expression() {
        let script = exists_script("select[name='country']");
        assert!(script.starts_with("document.querySelector"));
        assert!(script.ends_with("!== null"));
    }
}
