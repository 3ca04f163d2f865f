use super::*;
use serde_json::json;

fn profile() -> Profile {
    Profile::new(json!({
        "personal_info": {
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "phone": "+1 555 0100",
            "years_experience": 7
        },
        "common_answers": {
            "work_authorization": "yes",
            "salary_expectation": "120000"
        },
        "resume_path": "/home/ada/resume.pdf"
    }))
}

#[test]
fn test_forward_single_marker() {
    let interp = TemplateInterpolator::new();
    let out = interp.interpolate("{{personal_info.email}}", &profile());
    assert_eq!(out, "ada@example.com");
}

#[test]
fn test_forward_embedded_markers() {
    let interp = TemplateInterpolator::new();
    let out = interp.interpolate(
        "{{personal_info.first_name}} {{personal_info.last_name}}",
        &profile(),
    );
    assert_eq!(out, "Ada Lovelace");
}

#[test]
fn test_forward_unresolved_marker_left_untouched() {
    let interp = TemplateInterpolator::new();
    let out = interp.interpolate("{{personal_info.github}}", &profile());
    assert_eq!(out, "{{personal_info.github}}");

    // A partial miss must not corrupt the resolved part.
    let out = interp.interpolate("{{personal_info.first_name}} {{nope.nope}}", &profile());
    assert_eq!(out, "Ada {{nope.nope}}");
}

#[test]
fn test_forward_non_marker_braces_ignored() {
    let interp = TemplateInterpolator::new();
    let out = interp.interpolate("{not a marker} {{ }} plain", &profile());
    assert_eq!(out, "{not a marker} {{ }} plain");
}

#[test]
fn test_forward_numeric_value() {
    let interp = TemplateInterpolator::new();
    let out = interp.interpolate("{{personal_info.years_experience}}", &profile());
    assert_eq!(out, "7");
}

#[test]
fn test_forward_is_pure() {
    let interp = TemplateInterpolator::new();
    let p = profile();
    let a = interp.interpolate("{{common_answers.salary_expectation}}", &p);
    let b = interp.interpolate("{{common_answers.salary_expectation}}", &p);
    assert_eq!(a, b);
}

#[test]
fn test_reverse_personal_info_wins_over_common_answers() {
    // "yes" only exists in common_answers here, but build a collision to
    // check priority: add the same literal to both dictionaries.
    let p = Profile::new(json!({
        "personal_info": { "nickname": "yes" },
        "common_answers": { "work_authorization": "yes" }
    }));
    let interp = TemplateInterpolator::new();
    assert_eq!(interp.reverse("yes", &p), "{{personal_info.nickname}}");
}

#[test]
fn test_reverse_common_answer() {
    let interp = TemplateInterpolator::new();
    assert_eq!(
        interp.reverse("120000", &profile()),
        "{{common_answers.salary_expectation}}"
    );
}

#[test]
fn test_reverse_resume_path_sentinel() {
    let interp = TemplateInterpolator::new();
    assert_eq!(
        interp.reverse("/home/ada/resume.pdf", &profile()),
        RESUME_PATH_MARKER
    );
}

#[test]
fn test_reverse_unmatched_literal_verbatim() {
    let interp = TemplateInterpolator::new();
    assert_eq!(interp.reverse("something unique", &profile()), "something unique");
}

#[test]
fn test_round_trip() {
    let interp = TemplateInterpolator::new();
    let p = profile();
    let marker = interp.reverse("ada@example.com", &p);
    assert_eq!(marker, "{{personal_info.email}}");
    assert_eq!(interp.interpolate(&marker, &p), "ada@example.com");
}

#[test]
fn test_has_marker() {
    let interp = TemplateInterpolator::new();
    assert!(interp.has_marker("{{personal_info.email}}"));
    assert!(!interp.has_marker("ada@example.com"));
}
