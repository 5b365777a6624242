//! Parser for unpacking tool output

/// Marker preceding the catalog identifier in `--gog-game-id` output
pub const ID_MARKER: &str = "ID is ";

/// Find the catalog identifier in the tool's standard output
///
/// innoextract prints a line such as `GOG.com game ID is 1207658924`. The first
/// line containing [`ID_MARKER`] wins; the text after the marker is trimmed and
/// returned. Returns `None` if no line carries a non-empty identifier.
pub fn parse_catalog_id(stdout: &[u8]) -> Option<String> {
    let output = String::from_utf8_lossy(stdout);
    output
        .lines()
        .find_map(|line| line.split_once(ID_MARKER).map(|(_, id)| id.trim()))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Last few lines of a tool's stderr, for error messages
pub(crate) fn stderr_tail(stderr: &[u8], max_lines: usize) -> String {
    let output = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
