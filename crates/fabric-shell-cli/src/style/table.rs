//! Table formatting using comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use fabric_shell_types::{HealthState, NodeInfo, NodeStatus};

use super::colors::SemanticStyle;

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cell(title: &str) -> Cell {
    if super::no_color() {
        Cell::new(title)
    } else {
        Cell::new(title).add_attribute(Attribute::Bold).fg(Color::Cyan)
    }
}

fn colored(text: impl ToString, color: Color) -> Cell {
    if super::no_color() {
        Cell::new(text.to_string())
    } else {
        Cell::new(text.to_string()).fg(color)
    }
}

fn status_cell(status: NodeStatus) -> Cell {
    let color = match status {
        NodeStatus::Up => Color::Green,
        NodeStatus::Down | NodeStatus::Removed => Color::Red,
        NodeStatus::Disabling | NodeStatus::Disabled | NodeStatus::Enabling => Color::Yellow,
        NodeStatus::Invalid | NodeStatus::Unknown => Color::DarkGrey,
    };
    colored(status, color)
}

fn health_cell(health: HealthState) -> Cell {
    let color = match health {
        HealthState::Ok => Color::Green,
        HealthState::Warning => Color::Yellow,
        HealthState::Error => Color::Red,
        HealthState::Invalid | HealthState::Unknown => Color::DarkGrey,
    };
    colored(health, color)
}

/// One row per node: name, address, status, health, seed flag, instance.
pub fn node_table(nodes: &[NodeInfo]) -> Table {
    let mut table = base_table();
    table.set_header(
        ["Name", "Address", "Status", "Health", "Seed", "Instance"]
            .into_iter()
            .map(header_cell),
    );

    for node in nodes {
        table.add_row(vec![
            Cell::new(&node.name),
            Cell::new(&node.address),
            status_cell(node.status),
            health_cell(node.health_state),
            Cell::new(if node.is_seed_node { "yes" } else { "no" }),
            Cell::new(node.instance_id),
        ]);
    }

    table
}

pub fn print_node_table(nodes: &[NodeInfo]) {
    if nodes.is_empty() {
        println!("{}", "No nodes found.".muted());
        return;
    }

    println!("{}", node_table(nodes));
    let count = nodes.len();
    let word = if count == 1 { "node" } else { "nodes" };
    println!("{}", format!("({count} {word})").muted());
}

/// Creates a key-value info table (two columns: key and value).
pub fn info_table(entries: &[(&str, String)]) -> Table {
    let mut table = base_table();
    for (key, value) in entries {
        table.add_row(vec![colored(key, Color::DarkGrey), Cell::new(value)]);
    }
    table
}

pub fn print_info_table(entries: &[(&str, String)]) {
    println!("{}", info_table(entries));
}
