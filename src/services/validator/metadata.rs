use super::{Diagnostics, Submission};

pub(super) fn check(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let rb = sub.rulebook;
    let year = sub.ui.get("year").and_then(|v| v.as_i64());
    let tags: Option<Vec<String>> = sub.ui.get("tags").and_then(|v| v.as_array()).map(|arr| {
        arr.iter()
            .map(|t| match t.as_str() {
                Some(s) => s.to_lowercase(),
                None => t.to_string().to_lowercase(),
            })
            .collect()
    });
    diag.info.metadata.year = year;
    diag.info.metadata.tags = tags.clone().unwrap_or_default();

    if let (Some(year), Some(min)) = (year, rb.min_year) {
        if year < min {
            diag.violation(format!("Year {year} (min {min}) (ui/ui_car.json:year)"));
        }
    }

    let Some(tags) = tags.filter(|_| rb.enforce_body_types) else {
        return;
    };
    let has = |wanted: &String| tags.iter().any(|t| t == &wanted.to_lowercase());
    if rb.forbidden_body_types.iter().any(has) {
        diag.violation(format!("Forbidden body type tag in {tags:?} (ui/ui_car.json:tags)"));
    }
    if !rb.allowed_body_types.is_empty() && !rb.allowed_body_types.iter().any(has) {
        diag.violation(format!(
            "Missing allowed body type tag among {:?} (ui/ui_car.json:tags)",
            rb.allowed_body_types
        ));
    }
}
