//! Output formatting for text and JSON.

use anyhow::Result;
use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::{Table, Tabled};
use time::macros::format_description;
use vanadristi_core::{Dashboard, DetailView, ListView, SensorSummary};
use vanadristi_types::{
    AiAnalysisResponse, AiAnalysisResult, ChatHistoryItem, ChatMessage, ChatRole,
    IdentificationResult, Plant, SensorData, TrendData, parse_timestamp,
};

use crate::cli::StyleMode;
use crate::style;

/// Formatting options for output.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
    /// Visual styling mode.
    pub style: StyleMode,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            no_color: false,
            compact: false,
            style: StyleMode::Rich,
        }
    }
}

impl FormatOptions {
    pub fn new(no_color: bool, style: StyleMode) -> Self {
        // Plain mode automatically disables colors for pipe-friendliness
        Self {
            no_color: no_color || style == StyleMode::Plain,
            compact: false,
            style,
        }
    }

    pub fn is_rich(&self) -> bool {
        self.style == StyleMode::Rich
    }

    pub fn is_plain(&self) -> bool {
        self.style == StyleMode::Plain
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }

    fn title(&self, title: &str) -> String {
        if self.is_plain() {
            title.to_string()
        } else {
            style::format_title(title, self.no_color)
        }
    }

    fn label(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("{}", text.bold())
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("{}", text.dimmed())
        }
    }
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

/// Server timestamp as `YYYY-MM-DD HH:MM`, or the raw text if it does not parse.
#[must_use]
pub fn format_timestamp(raw: &str) -> String {
    parse_timestamp(raw)
        .ok()
        .and_then(|ts| {
            ts.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .ok()
        })
        .unwrap_or_else(|| raw.to_string())
}

// ============================================================================
// Plants
// ============================================================================

#[must_use]
pub fn format_plants_text(plants: &[Plant], opts: &FormatOptions) -> String {
    if plants.is_empty() {
        return "No plants yet. Add one with 'vanadristi plants add <NAME>'.\n".to_string();
    }

    #[derive(Tabled)]
    struct PlantRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Species")]
        species: String,
        #[tabled(rename = "Location")]
        location: String,
        #[tabled(rename = "Id")]
        id: String,
    }

    // Long free-text locations would wrap the table on narrow terminals.
    let location_width = (style::terminal_width() / 4).max(12);
    let rows: Vec<PlantRow> = plants
        .iter()
        .map(|p| PlantRow {
            name: if opts.no_color {
                p.name.clone()
            } else {
                format!("{}", p.name.green())
            },
            species: p
                .species
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Unknown Species".to_string()),
            location: style::truncate(&or_dash(p.location.as_deref()), location_width),
            id: p.id.clone(),
        })
        .collect();

    let mut table = Table::new(rows);
    style::apply_table_style(&mut table, opts.style);

    let header = if opts.is_rich() {
        format!("{} plant(s)\n\n", plants.len())
    } else {
        String::new()
    };
    format!("{}{}\n", header, table)
}

#[must_use]
pub fn format_plant_text(plant: &Plant, opts: &FormatOptions) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Property", "Value"]);
    builder.push_record(["Id", plant.id.as_str()]);
    builder.push_record(["Species", &or_dash(plant.species.as_deref())]);
    builder.push_record(["Location", &or_dash(plant.location.as_deref())]);
    builder.push_record(["Added", &format_timestamp(&plant.created_at)]);

    let mut table = builder.build();
    style::apply_table_style(&mut table, opts.style);

    format!("{}\n{}\n", opts.title(&plant.name), table)
}

/// Detail screen: the plant, then its latest reading if any.
#[must_use]
pub fn format_plant_detail_text(
    plant: &Plant,
    reading: Option<&SensorData>,
    opts: &FormatOptions,
) -> String {
    let mut out = format_plant_text(plant, opts);
    out.push('\n');
    match reading {
        Some(data) => out.push_str(&format_sensor_text(data, opts)),
        None => out.push_str(&opts.dim("No sensor data for this plant yet.\n")),
    }
    out
}

// ============================================================================
// Observation target
// ============================================================================

#[must_use]
pub fn format_target_text(
    target: Option<&Plant>,
    target_id: Option<&str>,
    opts: &FormatOptions,
) -> String {
    match (target, target_id) {
        (Some(plant), _) => format!(
            "Observing: {} ({})\n",
            opts.label(&plant.name),
            plant.id
        ),
        (None, Some(id)) => format!("Observing: {}\n", opts.label(id)),
        (None, None) => "No plant is being observed.\n".to_string(),
    }
}

// ============================================================================
// Sensors
// ============================================================================

#[must_use]
pub fn format_sensor_text(data: &SensorData, opts: &FormatOptions) -> String {
    let summary = SensorSummary::from(data);

    let mut builder = Builder::default();
    builder.push_record(["Metric", "Value"]);
    for row in &summary.rows {
        builder.push_record([
            style::format_sensor_label(row.label, opts.no_color),
            row.value.clone(),
        ]);
    }
    let mut table = builder.build();
    style::apply_table_style(&mut table, opts.style);

    let name = summary
        .plant_name
        .clone()
        .unwrap_or_else(|| data.plant_id.clone());
    let mut out = opts.title(&format!("Latest Sensor Data: {}", name));
    out.push('\n');
    out.push_str(&table.to_string());
    out.push('\n');
    out.push_str(&opts.dim(&format!("Recorded {}\n", format_timestamp(&data.timestamp))));
    out
}

#[must_use]
pub fn format_trends_text(trends: &[TrendData], opts: &FormatOptions) -> String {
    if trends.is_empty() {
        return "No trend data yet.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["Date", "Avg Temp", "Avg Moisture", "Avg Humidity"]);
    for day in trends {
        builder.push_record([
            day.date.clone(),
            format!("{:.1} °C", day.avg_temp),
            format!("{:.1} %", day.avg_moisture),
            format!("{:.1} %", day.avg_humidity),
        ]);
    }
    let mut table = builder.build();
    style::apply_table_style(&mut table, opts.style);

    format!("{}\n{}\n", opts.title("Sensor Trends"), table)
}

// ============================================================================
// AI
// ============================================================================

fn format_ai_result(result: &AiAnalysisResult, opts: &FormatOptions) -> String {
    let icon = style::diagnosis_icon(result.kind(), opts.is_plain() || opts.no_color);
    let mut out = format!(
        "{} {}  {}\n",
        icon,
        style::format_diagnosis_colored(&result.diagnosis, opts.no_color),
        opts.dim(&format!(
            "confidence {}",
            style::format_confidence(result.confidence, opts.no_color)
        )),
    );
    if !result.notes.is_empty() {
        out.push_str(&format!("\n{}\n", result.notes));
    }
    if !result.watering_recommendation.is_empty() {
        out.push_str(&format!(
            "\n{} {}\n",
            opts.label("Watering:"),
            result.watering_recommendation
        ));
    }
    if !result.actions.is_empty() {
        out.push_str(&format!("\n{}\n", opts.label("Recommended actions:")));
        for action in &result.actions {
            out.push_str(&format!("  - {}\n", action));
        }
    }
    out
}

#[must_use]
pub fn format_analysis_text(analysis: &AiAnalysisResponse, opts: &FormatOptions) -> String {
    let mut out = opts.title("AI Health Analysis");
    out.push('\n');
    out.push_str(&format_ai_result(&analysis.ai_result, opts));
    if let Some(data) = &analysis.sensor_data_used {
        out.push_str(&opts.dim(&format!(
            "\nBased on the reading from {}\n",
            format_timestamp(&data.timestamp)
        )));
    }
    out
}

#[must_use]
pub fn format_latest_analysis_text(item: Option<&ChatHistoryItem>, opts: &FormatOptions) -> String {
    let Some(item) = item else {
        return "No analysis found. Run 'vanadristi ai analyze' for a plant first.\n".to_string();
    };

    let plant = item
        .sensor_data
        .as_ref()
        .and_then(|s| s.plant_name.clone())
        .unwrap_or_else(|| item.plant_id.clone());
    let mut out = opts.title(&format!("Latest Health Alert: {}", plant));
    out.push('\n');
    match &item.ai_result_parsed {
        Some(result) => out.push_str(&format_ai_result(result, opts)),
        None => out.push_str("The analysis has no result.\n"),
    }
    out.push_str(&opts.dim(&format!(
        "\n{} | plant {}\n",
        format_timestamp(&item.timestamp),
        item.plant_id
    )));
    out
}

/// One line of a chat transcript.
#[must_use]
pub fn format_chat_message(message: &ChatMessage, opts: &FormatOptions) -> String {
    let speaker = match message.role {
        ChatRole::User => "You",
        ChatRole::Ai => "VanaDristi",
    };
    let speaker = if opts.no_color {
        format!("{}:", speaker)
    } else {
        match message.role {
            ChatRole::User => format!("{}", format!("{}:", speaker).cyan().bold()),
            ChatRole::Ai => format!("{}", format!("{}:", speaker).green().bold()),
        }
    };
    format!("{} {}\n", speaker, message.text)
}

// ============================================================================
// Identification
// ============================================================================

#[must_use]
pub fn format_identification_text(result: &IdentificationResult, opts: &FormatOptions) -> String {
    let mut out = opts.title(&result.common_name);
    out.push('\n');
    let scientific = if opts.no_color {
        result.scientific_name.clone()
    } else {
        format!("{}", result.scientific_name.italic())
    };
    out.push_str(&format!("{}\n", scientific));

    if result.is_toxic() {
        out.push_str(&format!(
            "\n{}\n",
            style::format_warning(&result.edible_or_medicinal, opts.no_color)
        ));
    }

    let edible = if result.is_toxic() {
        String::new()
    } else {
        result.edible_or_medicinal.clone()
    };
    let facts: Vec<(&str, String)> = [
        ("Family", result.family.clone()),
        ("Origin", result.origin.clone()),
        ("Lifespan", result.lifespan.clone()),
        ("Growth Habit", result.growth_habit.clone()),
        ("Flowering", result.flowering_season.clone()),
        ("Fruiting", result.fruiting_season.clone()),
        ("Toxicity", result.toxicity.clone()),
        ("Edible / Medicinal", edible),
        ("Uses", result.uses.join(", ")),
        ("Propagation", result.propagation_methods.join(", ")),
        ("Common Diseases", result.common_diseases.join(", ")),
        ("Similar Species", result.similar_species.join(", ")),
        ("Conservation", result.conservation_status.clone()),
    ]
    .into_iter()
    .filter(|(_, value)| !value.trim().is_empty())
    .collect();

    if !facts.is_empty() {
        let mut builder = Builder::default();
        for (label, value) in facts {
            builder.push_record([label.to_string(), value]);
        }
        let mut table = builder.build();
        style::apply_table_style(&mut table, opts.style);
        out.push('\n');
        out.push_str(&table.to_string());
        out.push('\n');
    }

    for (label, text) in [
        ("Care", &result.care_summary),
        ("Health from image", &result.diagnosis_from_image),
        ("Fun fact", &result.fun_fact),
    ] {
        if !text.is_empty() {
            out.push_str(&format!("\n{} {}\n", opts.label(&format!("{}:", label)), text));
        }
    }
    out
}

#[must_use]
pub fn format_identifications_text(results: &[IdentificationResult], opts: &FormatOptions) -> String {
    if results.is_empty() {
        return "No plants identified yet. Try 'vanadristi identify <FILE>'.\n".to_string();
    }

    #[derive(Tabled)]
    struct IdentificationRow {
        #[tabled(rename = "Common Name")]
        common_name: String,
        #[tabled(rename = "Scientific Name")]
        scientific_name: String,
        #[tabled(rename = "Family")]
        family: String,
        #[tabled(rename = "Toxic")]
        toxic: String,
    }

    let rows: Vec<IdentificationRow> = results
        .iter()
        .map(|r| IdentificationRow {
            common_name: r.common_name.clone(),
            scientific_name: r.scientific_name.clone(),
            family: or_dash(Some(&r.family)),
            toxic: if r.is_toxic() { "yes" } else { "no" }.to_string(),
        })
        .collect();

    let mut table = Table::new(rows);
    style::apply_table_style(&mut table, opts.style);
    format!("{}\n{}\n", opts.title("Identified Plants"), table)
}

// ============================================================================
// Dashboard
// ============================================================================

#[must_use]
pub fn format_dashboard_text(dashboard: &Dashboard, opts: &FormatOptions) -> String {
    let mut out = opts.title("VanaDristi Dashboard");
    out.push('\n');

    let plants = match &dashboard.plants {
        ListView::Loading => "Monitored plants: ...".to_string(),
        ListView::Error(message) => style::format_warning(message, opts.no_color),
        ListView::Empty | ListView::Ready(_) => {
            format!("Monitored plants: {}", opts.label(&dashboard.plant_count().to_string()))
        }
    };
    out.push_str(&plants);
    out.push_str("\n\n");

    match &dashboard.latest_analysis {
        DetailView::Loading => out.push_str("Loading latest analysis...\n"),
        DetailView::Error(message) => {
            out.push_str(&style::format_warning(message, opts.no_color));
            out.push('\n');
        }
        DetailView::Empty => out.push_str(&format_latest_analysis_text(None, opts)),
        DetailView::Ready(item) => {
            out.push_str(&format_latest_analysis_text(Some(item), opts));
            out.push('\n');
            match dashboard.latest_reading() {
                Some(reading) => out.push_str(&format_sensor_text(reading, opts)),
                None => out.push_str("No sensor data available.\n"),
            }
        }
    }
    out
}
