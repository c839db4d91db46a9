/// Lower-case, strip invisible characters and collapse runs of whitespace.
pub(crate) fn normalize_label(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::normalize_label;

    #[test]
    fn removes_bom_and_collapses_whitespace() {
        let source = "\u{feff}Medical   Emergency\t(PL)";
        assert_eq!(normalize_label(source), "medical emergency (pl)");
    }
}
