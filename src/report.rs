//! Report rendering
//!
//! Renders identified assets as a markdown table (the default) or JSON.

use std::path::Path;
use tokio::fs;

use crate::args::ReportFormat;
use crate::error::Result;
use crate::matcher::Asset;

pub const HEADERS: [&str; 5] = ["Repository", "File Path", "Line Number", "Line", "Asset Name"];

/// Header row, separator row, then one row per asset. No trailing newline.
pub fn to_markdown_table(assets: &[Asset]) -> String {
    let header_row = format!("| {} |", HEADERS.join(" | "));
    let separator_row = format!("| {} |", HEADERS.map(|_| "---").join(" | "));

    let mut rows = Vec::with_capacity(assets.len() + 2);
    rows.push(header_row);
    rows.push(separator_row);
    rows.extend(assets.iter().map(|asset| {
        format!(
            "| {} | {} | {} | {} | {} |",
            asset.repository, asset.filepath, asset.linenumber, asset.line, asset.name
        )
    }));

    rows.join("\n")
}

pub fn to_json(assets: &[Asset]) -> Result<String> {
    Ok(serde_json::to_string_pretty(assets)?)
}

pub fn render(assets: &[Asset], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Markdown => Ok(to_markdown_table(assets)),
        ReportFormat::Json => to_json(assets),
    }
}

/// Write the rendered report to `path`, replacing any previous report.
pub async fn write_report(path: &Path, assets: &[Asset], format: ReportFormat) -> Result<()> {
    let content = render(assets, format)?;
    fs::write(path, content.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(repository: &str, linenumber: usize, name: &str) -> Asset {
        Asset {
            repository: repository.into(),
            filepath: "views/layout.html".into(),
            linenumber,
            line: format!("&lt;script src=&quot;/js/{}&quot;&gt;", name),
            name: name.into(),
        }
    }

    #[test]
    fn empty_table_has_header_and_separator_only() {
        let table = to_markdown_table(&[]);
        assert_eq!(
            table,
            "| Repository | File Path | Line Number | Line | Asset Name |\n| --- | --- | --- | --- | --- |"
        );
        assert_eq!(table.lines().count(), 2);
    }

    #[test]
    fn one_row_per_asset() {
        let assets = vec![asset("ch-service", 42, "app.bundle.js"), asset("web", 7, "main.js")];
        let table = to_markdown_table(&assets);
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines.len(), assets.len() + 2);
        assert_eq!(
            lines[2],
            "| ch-service | views/layout.html | 42 | &lt;script src=&quot;/js/app.bundle.js&quot;&gt; | app.bundle.js |"
        );
        assert!(!table.ends_with('\n'));
    }

    #[test]
    fn json_uses_asset_field_names() {
        let json = to_json(&[asset("web", 3, "main.js")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["repository"], "web");
        assert_eq!(value[0]["filepath"], "views/layout.html");
        assert_eq!(value[0]["linenumber"], 3);
        assert_eq!(value[0]["name"], "main.js");
    }

    #[tokio::test]
    async fn write_report_writes_rendered_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identified_assets.md");
        let assets = vec![asset("web", 3, "main.js")];

        write_report(&path, &assets, ReportFormat::Markdown).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, to_markdown_table(&assets));
    }
}
