use std::path::Path;

use anyhow::{Context, Result};
use commcal_core::{CombineOptions, CombineStats, Settings, combine_directory};
use owo_colors::OwoColorize;

pub fn run(
    input_dir: &Path,
    output: &Path,
    name: String,
    exclude: Vec<String>,
    settings: Settings,
) -> Result<()> {
    let mut options = CombineOptions::new(name, settings);
    options.exclude = exclude;

    let stats = combine_directory(input_dir, output, &options)
        .with_context(|| format!("Failed to combine {}", input_dir.display()))?;

    println!("{}", render_summary(&stats, output));
    Ok(())
}

fn render_summary(stats: &CombineStats, output: &Path) -> String {
    let mut lines = Vec::new();

    for source in &stats.sources {
        let count = format!("{:>5}", source.events);
        let count = if source.events == 0 {
            count.dimmed().to_string()
        } else {
            count.green().to_string()
        };
        lines.push(format!("   {}  {} {}", count, source.file, source.source.dimmed()));
    }
    for file in &stats.failed {
        lines.push(format!("   {}  {}", "error".red(), file));
    }
    for file in &stats.excluded {
        lines.push(format!("   {}  {}", " skip".yellow(), file.dimmed()));
    }

    let removed = [
        (stats.geo_filtered, "outside allowed cities"),
        (stats.uid_removed, "repeated UIDs"),
        (stats.cross_source.removed, "cross-source duplicates"),
    ];
    for (count, reason) in removed.iter().filter(|(count, _)| *count > 0) {
        lines.push(format!("   {} {}", format!("-{}", count).yellow(), reason));
    }

    lines.push(String::new());
    lines.push(format!(
        "Wrote {} events to {}",
        stats.total.to_string().bold(),
        output.display()
    ));

    lines.join("\n")
}
