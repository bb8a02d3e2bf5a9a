//! Table output for poses and bone transforms

use pose_blend::Transform;
use prettytable::{Cell, Row, Table};

use super::format::{format_quat, format_vec3};

/// Empty table with bold column titles
pub fn create_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        headers
            .iter()
            .map(|h| Cell::new(h).style_spec("b"))
            .collect(),
    ));
    table
}

pub fn add_table_row<S: AsRef<str>>(table: &mut Table, cells: &[S]) {
    table.add_row(Row::new(
        cells.iter().map(|s| Cell::new(s.as_ref())).collect(),
    ));
}

/// Table with one row per bone: location, rotation (w first) and scale
pub fn transform_table<'a>(bones: impl IntoIterator<Item = (&'a str, &'a Transform)>) -> Table {
    let mut table = create_table(&["Bone", "Location", "Rotation (wxyz)", "Scale"]);
    for (bone, transform) in bones {
        add_table_row(
            &mut table,
            &[
                bone.to_string(),
                format_vec3(transform.location),
                format_quat(transform.rotation),
                format_vec3(transform.scale),
            ],
        );
    }
    table
}
