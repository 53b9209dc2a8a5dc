//! `DRAG_DROP:` tables
//!
//! Drag-and-drop questions describe their items and drop zones as a Markdown
//! table. Each row with content starts a new item; each row with a location
//! adds a drop zone for the most recent item, so an item used twice is one
//! full row followed by a row with only the location filled in:
//!
//! ```text
//! ![](map.png)
//!
//! | Drop Location | Drag Group | Drag Content | Unlimited Use? |
//! |:--:|:--:|:--:|:--:|
//! | 120, 45 | 1 | Paris | Yes|
//! | 300, 80 | 1 | | |
//! | | 1 | Rome | No|
//! ```
//!
//! Marker questions use shape, coordinates, label and a use count (`Inf` for
//! unlimited). Whatever follows a `%%%` line is an HTML preview for Markdown
//! editors and is never read back.

use std::fmt::Write as _;

use crate::common::images::{find_image_refs, ImageRef};
use crate::error::{QuizError, Result};
use crate::quiz::{DragContent, DragItem, DropZone, Marker, MarkerUses, MarkerZone, Shape};

pub const PREVIEW_MARKER: &str = "%%%";

const INFINITE_WORDS: &[&str] = &[
    "YES", "Yes", "yes", "y", "Y", "inf", "Inf", "INF", "INFINITY", "Infinity", "infinity",
];

const IMAGE_HEADER: &str = "| Drop Location | Drag Group | Drag Content | Unlimited Use? |";
const MARKER_HEADER: &str = "| Drop Shape | Drop Coords | Drag Content | Use # of times (Inf for $\\infty$) |";
const ALIGNMENT_ROW: &str = "|:--:|:--:|:--:|:--:|";

/// A parsed ddimageortext table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageTable {
    pub background: Option<String>,
    pub drags: Vec<DragItem>,
    pub drops: Vec<DropZone>,
}

/// A parsed ddmarker table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkerTable {
    pub background: Option<String>,
    pub markers: Vec<Marker>,
    pub zones: Vec<MarkerZone>,
}

fn is_infinite(cell: &str) -> bool {
    INFINITE_WORDS.contains(&cell.trim())
}

/// Cells of a data row; `None` for headers, alignment rows and prose.
fn data_cells(line: &str) -> Option<Vec<&str>> {
    let line = line.trim();
    let rest = line.strip_prefix('|')?;
    if line.len() <= 4 || rest.starts_with(':') || rest.trim_start().starts_with("Drop") {
        return None;
    }
    Some(rest.split('|').map(str::trim).collect())
}

fn background(line: &str) -> Option<String> {
    let line = line.trim();
    if !line.starts_with("![](") {
        return None;
    }
    find_image_refs(line).into_iter().next().map(|image| image.path)
}

fn row_error(question: &str, line: &str, message: &str) -> QuizError {
    QuizError::schema(question, format!("{message} in drag-drop row '{}'", line.trim()))
}

/// Read the ddimageortext table of `question`.
pub fn parse_image_table(question: &str, section: &str) -> Result<ImageTable> {
    let mut table = ImageTable::default();
    for line in section.lines() {
        if table.background.is_none() {
            if let Some(path) = background(line) {
                table.background = Some(path);
                continue;
            }
        }
        let Some(cells) = data_cells(line) else {
            continue;
        };
        if cells.len() < 4 {
            return Err(row_error(question, line, "expected four cells"));
        }

        if !cells[2].is_empty() {
            let group = cells[1]
                .parse()
                .map_err(|_| row_error(question, line, "invalid drag group"))?;
            let content = match find_image_refs(cells[2]).into_iter().next() {
                Some(image) => DragContent::Image(image.path),
                None => DragContent::Text(cells[2].to_string()),
            };
            table.drags.push(DragItem {
                group,
                content,
                infinite: is_infinite(cells[3]),
            });
        }
        if !cells[0].is_empty() {
            if table.drags.is_empty() {
                return Err(row_error(question, line, "drop location before any drag item"));
            }
            let (x, y) = cells[0]
                .split_once(',')
                .and_then(|(x, y)| Some((x.trim().parse().ok()?, y.trim().parse().ok()?)))
                .ok_or_else(|| row_error(question, line, "drop location is not 'x, y'"))?;
            table.drops.push(DropZone {
                x,
                y,
                choice: table.drags.len(),
            });
        }
    }
    Ok(table)
}

/// Read the ddmarker table of `question`.
pub fn parse_marker_table(question: &str, section: &str) -> Result<MarkerTable> {
    let mut table = MarkerTable::default();
    for line in section.lines() {
        if table.background.is_none() {
            if let Some(path) = background(line) {
                table.background = Some(path);
                continue;
            }
        }
        let Some(cells) = data_cells(line) else {
            continue;
        };
        if cells.len() < 4 {
            return Err(row_error(question, line, "expected four cells"));
        }

        if !cells[2].is_empty() {
            let uses = if is_infinite(cells[3]) {
                MarkerUses::Infinite
            } else {
                MarkerUses::Limited(
                    cells[3]
                        .parse()
                        .map_err(|_| row_error(question, line, "invalid use count"))?,
                )
            };
            table.markers.push(Marker {
                text: cells[2].to_string(),
                uses,
            });
        }
        if !cells[0].is_empty() {
            if table.markers.is_empty() {
                return Err(row_error(question, line, "drop shape before any marker"));
            }
            let shape: Shape = cells[0]
                .parse()
                .map_err(|_| row_error(question, line, "unknown shape mask"))?;
            table.zones.push(MarkerZone {
                shape,
                coords: cells[1].to_string(),
                choice: table.markers.len(),
            });
        }
    }
    Ok(table)
}

fn drag_cell(content: &DragContent) -> String {
    match content {
        DragContent::Text(text) => text.clone(),
        DragContent::Image(path) => ImageRef::render(path, None),
    }
}

/// Write a ddimageortext table followed by its preview.
pub fn write_image_table(background: Option<&str>, drags: &[DragItem], drops: &[DropZone]) -> String {
    let mut out = String::new();
    if let Some(path) = background {
        let _ = writeln!(out, "{}\n", ImageRef::render(path, None));
    }
    let _ = writeln!(out, "{IMAGE_HEADER}\n{ALIGNMENT_ROW}");
    for (index, drag) in drags.iter().enumerate() {
        let unlimited = if drag.infinite { "Yes" } else { "No" };
        let content = drag_cell(&drag.content);
        let mut placed = drops.iter().filter(|d| d.choice == index + 1).peekable();
        if placed.peek().is_none() {
            let _ = writeln!(out, "| | {} | {content} | {unlimited}|", drag.group);
        }
        for (n, drop) in placed.enumerate() {
            if n == 0 {
                let _ = writeln!(out, "| {}, {} | {} | {content} | {unlimited}|", drop.x, drop.y, drag.group);
            } else {
                let _ = writeln!(out, "| {}, {} | {} | | |", drop.x, drop.y, drag.group);
            }
        }
    }

    let _ = writeln!(out, "\n{PREVIEW_MARKER} Preview for Markdown editors, ignored when reading.\n");
    out.push_str("<div style=\"position: relative;\">\n");
    if let Some(path) = background {
        let _ = writeln!(out, "<img src=\"{path}\"  />");
    }
    for drop in drops {
        let Some(drag) = drop.choice.checked_sub(1).and_then(|i| drags.get(i)) else {
            continue;
        };
        let inner = match &drag.content {
            DragContent::Text(text) => text.clone(),
            DragContent::Image(path) => format!("<img src=\"{path}\"  />"),
        };
        let _ = writeln!(
            out,
            "<div style=\"position: absolute; left:{}px;top:{}px;\">{inner}</div>",
            drop.x, drop.y
        );
    }
    out.push_str("</div>\n");
    out
}

fn uses_cell(uses: MarkerUses) -> String {
    match uses {
        MarkerUses::Infinite => "Inf".to_string(),
        MarkerUses::Limited(n) => n.to_string(),
    }
}

/// Write a ddmarker table followed by its preview.
pub fn write_marker_table(background: Option<&str>, markers: &[Marker], zones: &[MarkerZone]) -> String {
    let mut out = String::new();
    if let Some(path) = background {
        let _ = writeln!(out, "{}\n", ImageRef::render(path, None));
    }
    let _ = writeln!(out, "{MARKER_HEADER}\n{ALIGNMENT_ROW}");
    for (index, marker) in markers.iter().enumerate() {
        let uses = uses_cell(marker.uses);
        let mut placed = zones.iter().filter(|z| z.choice == index + 1).peekable();
        if placed.peek().is_none() {
            let _ = writeln!(out, "| | | {} | {uses}|", marker.text);
        }
        for (n, zone) in placed.enumerate() {
            if n == 0 {
                let _ = writeln!(out, "| {} | {} | {} | {uses}|", zone.shape, zone.coords, marker.text);
            } else {
                let _ = writeln!(out, "| {} | {} | | |", zone.shape, zone.coords);
            }
        }
    }

    let _ = writeln!(out, "\n{PREVIEW_MARKER} Preview for Markdown editors, ignored when reading.\n");
    out.push_str("<div style=\"position: relative;\">\n");
    if let Some(path) = background {
        let _ = writeln!(out, "<img src=\"{path}\"  />");
    }
    for zone in zones {
        let Some(marker) = zone.choice.checked_sub(1).and_then(|i| markers.get(i)) else {
            continue;
        };
        if let Some(html) = zone_preview(zone, &marker.text) {
            out.push_str(&html);
            out.push_str("<!---->\n");
        }
    }
    out.push_str("</div>\n");
    out
}

/// `x,y;x,y;...` as numbers. `None` when any coordinate is not a number.
fn points(coords: &str) -> Option<Vec<Vec<f64>>> {
    coords
        .split(';')
        .map(|point| {
            point
                .split(',')
                .map(|n| n.trim().parse::<f64>().ok())
                .collect::<Option<Vec<f64>>>()
        })
        .collect()
}

const SHADE: &str = "background-color:rgba(150, 150, 0, 0.5)";

fn zone_preview(zone: &MarkerZone, label: &str) -> Option<String> {
    let points = points(&zone.coords)?;
    match zone.shape {
        Shape::Polygon => {
            let xs: Vec<f64> = points.iter().filter_map(|p| p.first().copied()).collect();
            let ys: Vec<f64> = points.iter().filter_map(|p| p.get(1).copied()).collect();
            if xs.is_empty() || ys.is_empty() {
                return None;
            }
            let path = zone.coords.replace(',', "px ").replace(';', "px, ");
            let centre = (xs.iter().sum::<f64>() / xs.len() as f64).round();
            let top = ys.iter().copied().fold(f64::INFINITY, f64::min).round();
            Some(format!(
                "<div style=\"width:1000px;height:1000px;position:absolute;top: 0;left:0;{SHADE};clip-path: polygon({path}px)\"></div>\n\
                 <h3 style=\"position:absolute;margin:0;left:{centre}px;top:{top}px\">{label}</h3>\n"
            ))
        }
        Shape::Rectangle => {
            let (corner, size) = (points.first()?, points.get(1)?);
            Some(format!(
                "<div style=\"position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;{SHADE};border-radius: 0%;\">\n\
                 <h3 style=\"position:absolute;text-align:center;margin:auto;left:0;right:0;top:0;bottom:0\">{label}</h3>\n\
                 </div>\n",
                corner.first()?,
                corner.get(1)?,
                size.first()?,
                size.get(1)?
            ))
        }
        Shape::Circle => {
            let (centre, radius) = (points.first()?, points.get(1)?.first()?);
            let (x, y) = (centre.first()?, centre.get(1)?);
            Some(format!(
                "<div style=\"width:1000px;height:1000px;position:absolute;top: 0;left:0;{SHADE};clip-path: circle({radius}px at {x}px {y}px)\"></div>\n\
                 <h3 style=\"position:absolute;margin:0;left:{}px;top:{}px;\">{label}</h3>\n",
                x - radius,
                y - radius
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_TABLE: &str = "![](map.png)

| Drop Location | Drag Group | Drag Content | Unlimited Use? |
|:--:|:--:|:--:|:--:|
| 120, 45 | 1 | Paris | Yes|
| 300, 80 | 1 | | |
| | 2 | ![](flag.png) | No|
| 10, 10 | 1 | Rome | No|
";

    #[test]
    fn reads_image_table() {
        let table = parse_image_table("q", IMAGE_TABLE).unwrap();
        assert_eq!(table.background.as_deref(), Some("map.png"));
        assert_eq!(table.drags.len(), 3);
        assert!(table.drags[0].infinite);
        assert_eq!(table.drags[1].content, DragContent::Image("flag.png".into()));
        assert_eq!(table.drags[1].group, 2);
        assert_eq!(
            table.drops,
            vec![
                DropZone { x: 120, y: 45, choice: 1 },
                DropZone { x: 300, y: 80, choice: 1 },
                DropZone { x: 10, y: 10, choice: 3 },
            ]
        );
    }

    #[test]
    fn image_table_reads_back() {
        let table = parse_image_table("q", IMAGE_TABLE).unwrap();
        let written = write_image_table(table.background.as_deref(), &table.drags, &table.drops);
        let section = written.split(PREVIEW_MARKER).next().unwrap();
        assert_eq!(parse_image_table("q", section).unwrap(), table);
        assert!(written.contains("<div style=\"position: absolute; left:300px;top:80px;\">Paris</div>"));
    }

    #[test]
    fn drop_before_item_is_rejected() {
        let err = parse_image_table("q", "| 1, 2 | 1 | | |").unwrap_err();
        assert!(matches!(err, QuizError::SchemaViolation { question, .. } if question == "q"));
    }

    #[test]
    fn reads_marker_table() {
        let section = "| Drop Shape | Drop Coords | Drag Content | Use # of times (Inf for $\\infty$) |
|:--:|:--:|:--:|:--:|
| c | 50,50;20 | North | 2|
| rectangle | 0,0;10,20 | | |
| | | South | Inf|
";
        let table = parse_marker_table("q", section).unwrap();
        assert_eq!(table.background, None);
        assert_eq!(table.markers[0].uses, MarkerUses::Limited(2));
        assert_eq!(table.markers[1].uses, MarkerUses::Infinite);
        assert_eq!(table.zones.len(), 2);
        assert_eq!(table.zones[0].shape, Shape::Circle);
        assert_eq!(table.zones[1].coords, "0,0;10,20");
        assert_eq!(table.zones[1].choice, 1);

        let written = write_marker_table(None, &table.markers, &table.zones);
        assert!(written.contains("| circle | 50,50;20 | North | 2|"));
        assert!(written.contains("clip-path: circle(20px at 50px 50px)"));
        let section = written.split(PREVIEW_MARKER).next().unwrap();
        assert_eq!(parse_marker_table("q", section).unwrap(), table);
    }

    #[test]
    fn unknown_shape_is_an_error() {
        let section = "| | | A | 1|\n| hexagon | 1,1 | | |";
        let err = parse_marker_table("q", section).unwrap_err();
        assert!(matches!(err, QuizError::SchemaViolation { question, .. } if question == "q"));
    }

    #[test]
    fn use_count_must_be_a_number() {
        let err = parse_marker_table("q", "| c | 1,1;2 | A | twice|").unwrap_err();
        assert!(err.to_string().contains("invalid use count"), "{err}");
        assert!(parse_marker_table("q", "| c | 1,1;2 | A | |").is_err());
    }

    #[test]
    fn broken_coordinates_skip_the_preview() {
        let zone = MarkerZone {
            shape: Shape::Polygon,
            coords: "a,b".into(),
            choice: 1,
        };
        assert_eq!(zone_preview(&zone, "x"), None);
    }
}
