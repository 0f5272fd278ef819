//! SVG charts: taxonomic composition, per-taxon pathway completion and
//! species-set overlap

use crate::error::{PipelineError, Result};
use crate::summary::TaxaCompletion;
use crate::taxonomy::AbundanceTable;
use crate::top_n::TopSpecies;
use glypho_common::TaxonomicRank;
use plotters::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

/// Label of the bucket holding every taxon outside the top N
pub const OTHER_TAXON: &str = "Other";

const FONT: &str = "sans-serif";

/// tab20
const PALETTE: [RGBColor; 20] = [
    RGBColor(31, 119, 180),
    RGBColor(174, 199, 232),
    RGBColor(255, 127, 14),
    RGBColor(255, 187, 120),
    RGBColor(44, 160, 44),
    RGBColor(152, 223, 138),
    RGBColor(214, 39, 40),
    RGBColor(255, 152, 150),
    RGBColor(148, 103, 189),
    RGBColor(197, 176, 213),
    RGBColor(140, 86, 75),
    RGBColor(196, 156, 148),
    RGBColor(227, 119, 194),
    RGBColor(247, 182, 210),
    RGBColor(127, 127, 127),
    RGBColor(199, 199, 199),
    RGBColor(188, 189, 34),
    RGBColor(219, 219, 141),
    RGBColor(23, 190, 207),
    RGBColor(158, 218, 229),
];

const COMPLETE_COLOR: RGBColor = RGBColor(76, 175, 80);
const INCOMPLETE_COLOR: RGBColor = RGBColor(244, 67, 54);

// ============================================================================
// Composition
// ============================================================================

/// Abundance per group (rows) and taxon (columns)
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionMatrix {
    pub rank: TaxonomicRank,
    pub groups: Vec<String>,
    /// Ordered by total abundance, highest first
    pub taxa: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CompositionMatrix {
    pub fn group_total(&self, group: usize) -> f64 {
        self.values.get(group).map(|row| row.iter().sum()).unwrap_or(0.0)
    }
}

/// Sum top-species abundance per group at `rank`.
///
/// The `top_n` taxa with the highest total across groups keep their name;
/// the rest are folded into `Other`. Species missing from `species_table`, or
/// without a name at `rank`, are skipped.
pub fn composition_matrix(
    groups: &[(String, Vec<TopSpecies>)],
    species_table: &AbundanceTable,
    rank: TaxonomicRank,
    top_n: usize,
) -> CompositionMatrix {
    let per_group: Vec<Vec<(&str, f64)>> = groups
        .iter()
        .map(|(_, rows)| {
            rows.iter()
                .filter_map(|row| {
                    let taxon = species_table.lineage_of(&row.species)?.get(rank)?;
                    Some((taxon, row.average_abundance.unwrap_or(0.0)))
                })
                .collect()
        })
        .collect();

    let mut totals: Vec<(&str, f64)> = Vec::new();
    for (taxon, value) in per_group.iter().flatten() {
        match totals.iter().position(|(t, _)| t == taxon) {
            Some(i) => totals[i].1 += value,
            None => totals.push((*taxon, *value)),
        }
    }
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    let kept: BTreeSet<&str> = totals.iter().take(top_n).map(|(t, _)| *t).collect();

    let mut taxa: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); groups.len()];

    for (g, rows) in per_group.iter().enumerate() {
        for (taxon, value) in rows {
            let label = if kept.contains(taxon) { *taxon } else { OTHER_TAXON };
            let column = *index.entry(label.to_string()).or_insert_with(|| {
                taxa.push(label.to_string());
                taxa.len() - 1
            });
            for row in values.iter_mut() {
                row.resize(taxa.len(), 0.0);
            }
            values[g][column] += value;
        }
    }
    for row in values.iter_mut() {
        row.resize(taxa.len(), 0.0);
    }

    // Reorder columns by total, highest first
    let mut order: Vec<usize> = (0..taxa.len()).collect();
    let column_total = |c: usize| values.iter().map(|row| row[c]).sum::<f64>();
    order.sort_by(|&a, &b| column_total(b).partial_cmp(&column_total(a)).unwrap_or(Ordering::Equal));

    CompositionMatrix {
        rank,
        groups: groups.iter().map(|(name, _)| name.clone()).collect(),
        taxa: order.iter().map(|&c| taxa[c].clone()).collect(),
        values: values
            .iter()
            .map(|row| order.iter().map(|&c| row[c]).collect())
            .collect(),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Stacked bar per group, one segment per taxon
pub fn plot_composition(matrix: &CompositionMatrix, output: &Path) -> Result<()> {
    if matrix.groups.is_empty() || matrix.taxa.is_empty() {
        return Err(PipelineError::NoData("nothing to plot in composition".to_string()));
    }

    let rank = title_case(matrix.rank.as_str());
    let y_max = (0..matrix.groups.len())
        .map(|g| matrix.group_total(g))
        .fold(0.0, f64::max)
        .max(f64::EPSILON)
        * 1.05;

    let root = SVGBackend::new(output, (1000, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(PipelineError::plot)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{rank} Composition of top species by Group"), (FONT, 22.0).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..matrix.groups.len()).into_segmented(), 0.0..y_max)
        .map_err(PipelineError::plot)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(matrix.groups.len())
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => matrix.groups.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .y_desc("Average Abundance")
        .draw()
        .map_err(PipelineError::plot)?;

    let mut base = vec![0.0; matrix.groups.len()];
    for (t, taxon) in matrix.taxa.iter().enumerate() {
        let color = PALETTE[t % PALETTE.len()];
        let bars: Vec<Rectangle<(SegmentValue<usize>, f64)>> = (0..matrix.groups.len())
            .map(|g| {
                let bottom = base[g];
                let top = bottom + matrix.values[g][t];
                base[g] = top;
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(g), bottom), (SegmentValue::Exact(g + 1), top)],
                    color.filled(),
                );
                bar.set_margin(0, 0, 20, 20);
                bar
            })
            .collect();

        chart
            .draw_series(bars)
            .map_err(PipelineError::plot)?
            .label(taxon.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(PipelineError::plot)?;

    root.present().map_err(PipelineError::plot)?;
    info!("Composition plot saved to {}", output.display());
    Ok(())
}

// ============================================================================
// Taxa completion
// ============================================================================

/// Horizontal grouped bars of complete and incomplete species per taxon,
/// smallest total at the bottom
pub fn plot_taxa_completion(rows: &[TaxaCompletion], output: &Path) -> Result<()> {
    if rows.is_empty() {
        return Err(PipelineError::NoData("no taxa to plot".to_string()));
    }

    let mut rows: Vec<&TaxaCompletion> = rows.iter().collect();
    rows.sort_by_key(|row| row.total());

    let x_max = rows.iter().map(|r| r.complete.max(r.incomplete)).max().unwrap_or(0) + 1;
    let height = (rows.len() as u32 * 28).max(300) + 100;

    let root = SVGBackend::new(output, (800, height)).into_drawing_area();
    root.fill(&WHITE).map_err(PipelineError::plot)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Pathway Completion per taxa", (FONT, 22.0).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(160)
        .build_cartesian_2d(0..x_max, (0..rows.len()).into_segmented())
        .map_err(PipelineError::plot)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(rows.len())
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => rows.get(*i).map(|r| r.taxon.clone()).unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc("Number of Species")
        .y_desc("Taxon")
        .draw()
        .map_err(PipelineError::plot)?;

    // Split each row's band in two: complete on top, incomplete below
    let band = chart.plotting_area().dim_in_pixel().1 / rows.len() as u32;
    let half = band / 2;

    let series: [(&str, RGBColor, fn(&TaxaCompletion) -> usize, (u32, u32)); 2] = [
        ("Complete", COMPLETE_COLOR, |r| r.complete, (2, half)),
        ("Incomplete", INCOMPLETE_COLOR, |r| r.incomplete, (half, 2)),
    ];

    for (label, color, count, (top, bottom)) in series {
        let bars: Vec<Rectangle<(usize, SegmentValue<usize>)>> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut bar = Rectangle::new(
                    [(0, SegmentValue::Exact(i)), (count(row), SegmentValue::Exact(i + 1))],
                    color.filled(),
                );
                bar.set_margin(top, bottom, 0, 0);
                bar
            })
            .collect();

        chart
            .draw_series(bars)
            .map_err(PipelineError::plot)?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(PipelineError::plot)?;

    root.present().map_err(PipelineError::plot)?;
    info!("Taxa completion plot saved to {}", output.display());
    Ok(())
}

// ============================================================================
// Venn
// ============================================================================

/// Region sizes of a two-set Venn diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VennCounts {
    pub only_left: usize,
    pub both: usize,
    pub only_right: usize,
}

pub fn venn_counts(left: &BTreeSet<String>, right: &BTreeSet<String>) -> VennCounts {
    let both = left.intersection(right).count();
    VennCounts {
        only_left: left.len() - both,
        both,
        only_right: right.len() - both,
    }
}

/// Two overlapping circles labelled with region sizes
pub fn plot_venn(
    labels: (&str, &str),
    left: &BTreeSet<String>,
    right: &BTreeSet<String>,
    output: &Path,
) -> Result<VennCounts> {
    let counts = venn_counts(left, right);
    let (width, height) = (640i32, 420i32);
    let radius = 130i32;
    let (cy, left_cx, right_cx) = (height / 2 + 10, width / 2 - 80, width / 2 + 80);

    let root = SVGBackend::new(output, (width as u32, height as u32)).into_drawing_area();
    root.fill(&WHITE).map_err(PipelineError::plot)?;

    root.draw(&Circle::new((left_cx, cy), radius, PALETTE[0].mix(0.4).filled()))
        .map_err(PipelineError::plot)?;
    root.draw(&Circle::new((right_cx, cy), radius, PALETTE[2].mix(0.4).filled()))
        .map_err(PipelineError::plot)?;

    let label_style = (FONT, 20.0).into_font().color(&BLACK);
    let count_style = (FONT, 26.0).into_font().color(&BLACK);

    let texts = [
        (labels.0.to_string(), (left_cx - radius, cy - radius - 25), &label_style),
        (labels.1.to_string(), (right_cx + radius / 3, cy - radius - 25), &label_style),
        (counts.only_left.to_string(), (left_cx - radius / 2 - 10, cy - 10), &count_style),
        (counts.both.to_string(), (width / 2 - 8, cy - 10), &count_style),
        (counts.only_right.to_string(), (right_cx + radius / 2 - 10, cy - 10), &count_style),
    ];
    for (text, position, style) in texts {
        root.draw(&Text::new(text, position, style.clone()))
            .map_err(PipelineError::plot)?;
    }

    root.present().map_err(PipelineError::plot)?;
    info!(
        only_left = counts.only_left,
        both = counts.both,
        only_right = counts.only_right,
        "Venn diagram saved to {}",
        output.display()
    );
    Ok(counts)
}
