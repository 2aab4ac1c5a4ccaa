use clipcap_types::{Caption, TimeRange};

/// Captions that lie entirely inside `range`.
pub fn captions_in_range(captions: &[Caption], range: &TimeRange) -> Vec<Caption> {
    captions
        .iter()
        .filter(|caption| caption.start_time >= range.start && caption.end_time <= range.end)
        .cloned()
        .collect()
}

/// Length badge such as `"1.5s"`, or `None` for captions without a positive
/// duration.
pub fn duration_label(caption: &Caption) -> Option<String> {
    (caption.end_time > caption.start_time).then(|| format!("{:.1}s", caption.duration()))
}
