//! Canvas layout: places the domains at fixed positions, sizes them by
//! content and styles the connections between them. `render_svg` turns a
//! layout into a standalone picture.

use crate::project::{Connection, Project};
use crate::types::{Domain, DomainLayer};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

const NODE_MIN_SIZE: u32 = 60;
const NODE_MAX_SIZE: u32 = 100;
const NODE_GROWTH_PER_ITEM: u32 = 5;
const LEGEND_WIDTH: u32 = 220;
const DETAILS_MARGIN: u32 = 80;

const RISK_EDGE_COLOR: &str = "#FF6B6B";
const MITIGATION_EDGE_COLOR: &str = "#4ECDC4";
const GENERAL_EDGE_COLOR: &str = "#95A5A6";

/// Normalized (x, y) position of a domain; y grows upwards.
pub fn domain_position(domain: Domain) -> (f64, f64) {
    match domain {
        Domain::Enterprise => (0.5, 0.9),
        Domain::Products => (0.15, 0.7),
        Domain::Services => (0.5, 0.7),
        Domain::Information => (0.85, 0.7),
        Domain::People => (0.15, 0.5),
        Domain::Process => (0.5, 0.5),
        Domain::Facilities => (0.85, 0.5),
        Domain::Applications => (0.2, 0.2),
        Domain::Platforms => (0.4, 0.2),
        Domain::Network => (0.6, 0.2),
        Domain::Data => (0.8, 0.2),
    }
}

/// Canvas drawing order: top row first.
pub const CANVAS_DOMAINS: [Domain; 11] = [
    Domain::Enterprise,
    Domain::Products,
    Domain::Services,
    Domain::Information,
    Domain::People,
    Domain::Process,
    Domain::Facilities,
    Domain::Applications,
    Domain::Platforms,
    Domain::Network,
    Domain::Data,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CanvasOptions {
    pub width: u32,
    pub height: u32,
    pub top_offset: u32,
    pub show_details: bool,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 500,
            top_offset: 60,
            show_details: true,
        }
    }
}

impl CanvasOptions {
    /// Pixel centre for a normalized position, truncated toward zero.
    pub fn to_pixels(&self, (x, y): (f64, f64)) -> (i64, i64) {
        let px = (x * self.width as f64) as i64;
        let py = ((1.0 - y) * self.height as f64) as i64 + self.top_offset as i64;
        (px, py)
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CanvasNode {
    pub domain: Domain,
    pub layer: DomainLayer,
    pub color: String,
    pub x: i64,
    pub y: i64,
    pub size: u32,
    pub elements: usize,
    pub risks: usize,
    pub mitigations: usize,
    pub connections: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Risk,
    Mitigation,
    General,
}

impl EdgeKind {
    pub fn of(connection: &Connection) -> Self {
        if connection.risk_id.is_some() {
            EdgeKind::Risk
        } else if connection.mitigation_id.is_some() {
            EdgeKind::Mitigation
        } else {
            EdgeKind::General
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            EdgeKind::Risk => RISK_EDGE_COLOR,
            EdgeKind::Mitigation => MITIGATION_EDGE_COLOR,
            EdgeKind::General => GENERAL_EDGE_COLOR,
        }
    }

    pub fn stroke_width(&self) -> u32 {
        match self {
            EdgeKind::Risk | EdgeKind::Mitigation => 3,
            EdgeKind::General => 2,
        }
    }

    pub fn dashed(&self) -> bool {
        matches!(self, EdgeKind::Risk)
    }

    fn legend(&self) -> &'static str {
        match self {
            EdgeKind::Risk => "Risk Connection",
            EdgeKind::Mitigation => "Mitigation Connection",
            EdgeKind::General => "General Connection",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CanvasEdge {
    pub id: String,
    pub source: Domain,
    pub target: Domain,
    pub kind: EdgeKind,
    pub color: String,
    pub dashed: bool,
    pub stroke_width: u32,
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    pub label: String,
    pub label_x: i64,
    pub label_y: i64,
    pub risk_id: Option<String>,
    pub mitigation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CanvasLayout {
    pub title: String,
    pub options: CanvasOptions,
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<CanvasEdge>,
}

impl CanvasLayout {
    pub fn node(&self, domain: Domain) -> Option<&CanvasNode> {
        self.nodes.iter().find(|n| n.domain == domain)
    }
}

pub fn node_size(items: usize) -> u32 {
    let grown = NODE_MIN_SIZE as usize + items * NODE_GROWTH_PER_ITEM as usize;
    grown.clamp(NODE_MIN_SIZE as usize, NODE_MAX_SIZE as usize) as u32
}

pub fn layout(project: &Project, options: &CanvasOptions) -> CanvasLayout {
    let nodes = CANVAS_DOMAINS
        .iter()
        .map(|&domain| {
            let (x, y) = options.to_pixels(domain_position(domain));
            let bucket = project.domains.get(&domain);
            let elements = bucket.map_or(0, |b| b.elements.len());
            let risks = bucket.map_or(0, |b| b.risk_ids.len());
            let mitigations = bucket.map_or(0, |b| b.mitigation_ids.len());
            let layer = domain.layer();
            CanvasNode {
                domain,
                layer,
                color: layer.color().to_string(),
                x,
                y,
                size: node_size(elements + risks + mitigations),
                elements,
                risks,
                mitigations,
                connections: project.connection_count(domain),
            }
        })
        .collect();

    let edges = project
        .connections
        .iter()
        .map(|c| {
            let (x1, y1) = options.to_pixels(domain_position(c.source));
            let (x2, y2) = options.to_pixels(domain_position(c.target));
            let kind = EdgeKind::of(c);
            CanvasEdge {
                id: c.id.clone(),
                source: c.source,
                target: c.target,
                kind,
                color: kind.color().to_string(),
                dashed: kind.dashed(),
                stroke_width: kind.stroke_width(),
                x1,
                y1,
                x2,
                y2,
                label: c.interaction.as_str().to_string(),
                label_x: (x1 + x2).div_euclid(2),
                label_y: (y1 + y2).div_euclid(2),
                risk_id: c.risk_id.clone(),
                mitigation_id: c.mitigation_id.clone(),
            }
        })
        .collect();

    CanvasLayout {
        title: format!("{} - Security Architecture Canvas", project.name),
        options: *options,
        nodes,
        edges,
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn marker_id(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Risk => "arrow-risk",
        EdgeKind::Mitigation => "arrow-mitigation",
        EdgeKind::General => "arrow-general",
    }
}

/// Moves the end of an edge back to the rim of the target node so the
/// arrowhead stays visible.
fn shorten(edge: &CanvasEdge, radius: f64) -> (f64, f64) {
    let dx = (edge.x2 - edge.x1) as f64;
    let dy = (edge.y2 - edge.y1) as f64;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= radius {
        return (edge.x2 as f64, edge.y2 as f64);
    }
    (
        edge.x2 as f64 - dx / len * radius,
        edge.y2 as f64 - dy / len * radius,
    )
}

/// Renders the layout as an SVG document.
pub fn render_svg(layout: &CanvasLayout) -> String {
    let opts = &layout.options;
    let width = opts.width + LEGEND_WIDTH;
    let height = opts.height + opts.top_offset + DETAILS_MARGIN;
    let mut svg = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif">"#
    );
    svg.push_str("<defs>\n");
    for kind in [EdgeKind::Risk, EdgeKind::Mitigation, EdgeKind::General] {
        let _ = writeln!(
            svg,
            r#"<marker id="{}" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8" orient="auto-start-reverse"><path d="M 0 0 L 10 5 L 0 10 z" fill="{}"/></marker>"#,
            marker_id(kind),
            kind.color()
        );
    }
    svg.push_str("</defs>\n");
    let _ = writeln!(
        svg,
        r##"<rect x="1" y="1" width="{}" height="{}" rx="12" fill="#F8F9FA" stroke="#E0E0E0" stroke-width="2"/>"##,
        width - 2,
        height - 2
    );
    let _ = writeln!(
        svg,
        r##"<text x="{}" y="32" text-anchor="middle" font-size="18" fill="#333333">{}</text>"##,
        width / 2,
        escape_xml(&layout.title)
    );

    for edge in &layout.edges {
        let radius = layout
            .node(edge.target)
            .map_or(NODE_MIN_SIZE, |n| n.size) as f64
            / 2.0;
        let (ex, ey) = shorten(edge, radius);
        let dash = if edge.dashed {
            r#" stroke-dasharray="8 4""#
        } else {
            ""
        };
        let _ = writeln!(
            svg,
            r#"<line x1="{}" y1="{}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{}"{} opacity="0.8" marker-end="url(#{})"/>"#,
            edge.x1,
            edge.y1,
            ex,
            ey,
            edge.color,
            edge.stroke_width,
            dash,
            marker_id(edge.kind)
        );
    }

    for node in &layout.nodes {
        let r = node.size / 2;
        let _ = writeln!(
            svg,
            r##"<circle cx="{}" cy="{}" r="{}" fill="{}" stroke="#FFFFFF" stroke-width="3"/>"##,
            node.x, node.y, r, node.color
        );
        let _ = writeln!(
            svg,
            r##"<text x="{}" y="{}" text-anchor="middle" font-size="11" font-weight="bold" fill="#FFFFFF">{}</text>"##,
            node.x,
            node.y + 4,
            escape_xml(node.domain.as_str())
        );
        if opts.show_details {
            let top = node.y + r as i64 + 10;
            let _ = writeln!(
                svg,
                r##"<rect x="{}" y="{}" width="90" height="30" rx="8" fill="#FFFFFF" stroke="#DDDDDD"/>"##,
                node.x - 45,
                top
            );
            let _ = writeln!(
                svg,
                r##"<text x="{}" y="{}" text-anchor="middle" font-size="10" fill="#666666">E:{} R:{} M:{}</text>"##,
                node.x,
                top + 12,
                node.elements,
                node.risks,
                node.mitigations
            );
            let _ = writeln!(
                svg,
                r##"<text x="{}" y="{}" text-anchor="middle" font-size="10" fill="#666666">links:{}</text>"##,
                node.x,
                top + 25,
                node.connections
            );
        }
    }

    for edge in &layout.edges {
        let _ = writeln!(
            svg,
            r##"<rect x="{}" y="{}" width="60" height="16" rx="4" fill="#FFFFFF" stroke="{}"/>"##,
            edge.label_x - 30,
            edge.label_y - 10,
            edge.color
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="9" fill="{}">{}</text>"#,
            edge.label_x,
            edge.label_y + 2,
            edge.color,
            escape_xml(&edge.label)
        );
    }

    let lx = opts.width + 20;
    let _ = writeln!(
        svg,
        r##"<rect x="{lx}" y="60" width="{}" height="90" rx="8" fill="#FFFFFF" stroke="#DDDDDD"/>"##,
        LEGEND_WIDTH - 40
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="80" font-size="12" font-weight="bold">Legend</text>"#,
        lx + 15
    );
    for (i, kind) in [EdgeKind::Risk, EdgeKind::Mitigation, EdgeKind::General]
        .into_iter()
        .enumerate()
    {
        let y = 100 + i as u32 * 18;
        let dash = if kind.dashed() {
            r#" stroke-dasharray="4 2""#
        } else {
            ""
        };
        let _ = writeln!(
            svg,
            r#"<line x1="{}" y1="{y}" x2="{}" y2="{y}" stroke="{}" stroke-width="{}"{dash}/>"#,
            lx + 15,
            lx + 35,
            kind.color(),
            kind.stroke_width()
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="10">{}</text>"#,
            lx + 43,
            y + 4,
            kind.legend()
        );
    }

    svg.push_str("</svg>\n");
    svg
}
