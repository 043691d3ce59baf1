use std::io::{self, Write};

use anyhow::Result;
use clap::ValueEnum;
use prettytable::{Table, format::consts::FORMAT_CLEAN, row};
use serde::Serialize;
use suspense_cache::{CacheKey, InvalidKeyDerivation};
use suspense_fonts::fonts::{FontDisplay, FontFormat, FontRequest};
use suspense_fonts::render::Rendered;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// A human readable table.
    Table,
    /// A JSON summary.
    Json,
}

#[derive(Debug, Serialize)]
struct SlotSummary<'a> {
    slot: usize,
    family: &'a str,
    src: String,
    display: FontDisplay,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<FontFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    passes: usize,
    loaded: usize,
    failed: usize,
    slots: Vec<SlotSummary<'a>>,
}

fn summarize(rendered: &Rendered) -> Summary<'_> {
    let slots = rendered
        .slots
        .iter()
        .map(|report| {
            let request = &report.slot.request;
            let mut summary = SlotSummary {
                slot: report.slot.id,
                family: &request.family,
                src: request.src.to_string(),
                display: request.display,
                status: "loaded",
                format: None,
                size: None,
                error: None,
            };
            match &report.outcome {
                Ok(font) => {
                    summary.format = Some(font.format);
                    summary.size = Some(font.data.len());
                }
                Err(err) => {
                    summary.status = "failed";
                    summary.error = Some(err.to_string());
                }
            }
            summary
        })
        .collect();

    Summary {
        passes: rendered.passes,
        loaded: rendered.loaded(),
        failed: rendered.failed(),
        slots,
    }
}

#[derive(Debug, Serialize)]
struct KeySummary {
    font: String,
    key: String,
    metadata: String,
}

fn summarize_keys(fonts: &[FontRequest]) -> Result<Vec<KeySummary>, InvalidKeyDerivation> {
    fonts
        .iter()
        .map(|font| {
            let key = CacheKey::from_params(font)?;
            Ok(KeySummary {
                font: font.to_string(),
                key: key.hex(),
                metadata: key.metadata().to_owned(),
            })
        })
        .collect()
}

/// Prints the cache key that each font is loaded under.
pub fn print_keys(fonts: &[FontRequest]) -> Result<()> {
    for summary in summarize_keys(fonts)? {
        println!("{}  {}", summary.key, summary.metadata);
    }
    Ok(())
}

pub fn print_rendered(rendered: &Rendered, format: OutputFormat) -> Result<()> {
    let summary = summarize(rendered);
    match format {
        OutputFormat::Json => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &summary)?;
            writeln!(stdout)?;
        }
        OutputFormat::Table => print_table(&summary),
    }
    Ok(())
}

fn print_table(summary: &Summary) {
    let mut table = Table::new();
    table.set_format(*FORMAT_CLEAN);
    table.set_titles(row![b => "Slot", "Family", "Source", "Display", "Font"]);

    for slot in &summary.slots {
        let font = match (&slot.format, &slot.size, &slot.error) {
            (Some(format), Some(size), _) => format!("{format}, {size} bytes"),
            (_, _, Some(error)) => error.clone(),
            _ => String::new(),
        };
        table.add_row(row![r->slot.slot, slot.family, slot.src, slot.display, font]);
    }

    table.printstd();
    println!();
    println!(
        "{} loaded, {} failed after {} render passes",
        summary.loaded, summary.failed, summary.passes
    );
}
