//! Show the running instances of a fleet

use crate::client::{ApiClient, FleetResponse};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct InstanceRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "IMAGE")]
    image: String,
    #[tabled(rename = "STATE")]
    state: String,
}

pub async fn show_fleet(client: &ApiClient, name: &str, format: OutputFormat) -> Result<()> {
    let path = format!("/fleets/{}", name);
    let response: FleetResponse = client.get(&path).await?;

    if format == OutputFormat::Json {
        output::print_json(&response);
        return Ok(());
    }

    if response.instances.is_empty() {
        output::print_warning(&format!("No instances found for fleet {}", name));
        return Ok(());
    }

    let mut rows: Vec<InstanceRow> = response
        .instances
        .iter()
        .map(|i| InstanceRow {
            name: i
                .names
                .first()
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_default(),
            id: i.id.chars().take(12).collect(),
            image: i.image.clone(),
            state: output::color_state(&i.state),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    output::print_table(&rows, format);
    Ok(())
}
