use crate::model::{Canvas, OrderEntry};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct CanvasDump {
    pub grid: [i32; 2],
    pub snap: bool,
    pub objects: Vec<ObjectDump>,
    pub ports: Vec<PortDump>,
    pub connectors: Vec<ConnDump>,
    pub order: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ObjectDump {
    pub id: u32,
    pub shape: String,
    pub start: [i32; 2],
    pub end: [i32; 2],
    pub group: Option<u32>,
    pub ports: Vec<String>,
    pub order: usize,
}

#[derive(Debug, Serialize)]
pub struct PortDump {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub obj: u32,
    pub connectors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnDump {
    pub id: String,
    pub order: usize,
    pub segments: Vec<[i32; 4]>,
    pub ports: Vec<String>,
    pub junctions: Vec<[i32; 2]>,
}

impl CanvasDump {
    pub fn from_canvas(cnv: &Canvas) -> Self {
        let objects = cnv
            .objects
            .iter()
            .map(|obj| ObjectDump {
                id: obj.id.0,
                shape: obj.kind.as_str().to_string(),
                start: [obj.start.x, obj.start.y],
                end: [obj.end.x, obj.end.y],
                group: obj.group.map(|g| g.0),
                ports: obj.ports.iter().map(|p| p.to_string()).collect(),
                order: obj.order,
            })
            .collect();

        let ports = cnv
            .ports
            .iter()
            .map(|port| PortDump {
                id: port.id.to_string(),
                x: port.pos.x,
                y: port.pos.y,
                obj: port.obj.0,
                connectors: port.conns.iter().map(|c| c.to_string()).collect(),
            })
            .collect();

        let connectors = cnv
            .conns
            .iter()
            .map(|conn| ConnDump {
                id: conn.id.to_string(),
                order: conn.order,
                segments: conn
                    .segments
                    .iter()
                    .map(|s| [s.a.x, s.a.y, s.b.x, s.b.y])
                    .collect(),
                ports: conn.ports.iter().map(|p| p.to_string()).collect(),
                junctions: conn.junctions.iter().map(|j| [j.x, j.y]).collect(),
            })
            .collect();

        let order = cnv
            .order
            .iter()
            .map(|entry| match entry {
                OrderEntry::Object(id) => format!("object:{id}"),
                OrderEntry::Conn(id) => format!("connector:{id}"),
            })
            .collect();

        CanvasDump {
            grid: [cnv.grid.x, cnv.grid.y],
            snap: cnv.grid.snap,
            objects,
            ports,
            connectors,
            order,
        }
    }
}

pub fn write_canvas_dump(path: &Path, cnv: &Canvas) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &CanvasDump::from_canvas(cnv))?;
    Ok(())
}

pub fn dump_to_string(cnv: &Canvas) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&CanvasDump::from_canvas(cnv))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::engine;
    use crate::model::{Pt, ShapeKind};

    #[test]
    fn dump_projects_full_state() {
        let mut cnv = Canvas::new(GridConfig::default());
        let obj = cnv.add_object(ShapeKind::Rect, Pt::new(0, 0), Pt::new(100, 100));
        engine::add_port(&mut cnv, obj, Pt::new(100, 50)).unwrap();
        engine::draw_connector(&mut cnv, &[(Pt::new(100, 50), Pt::new(200, 50))]).unwrap();

        let dump = CanvasDump::from_canvas(&cnv);
        assert_eq!(dump.objects.len(), 1);
        assert_eq!(dump.ports.len(), 1);
        assert_eq!(dump.connectors.len(), 1);
        assert_eq!(dump.ports[0].connectors, vec!["C1".to_string()]);
        assert_eq!(dump.order.len(), 2);

        let json = dump_to_string(&cnv).unwrap();
        assert!(json.contains("\"C1\""));
        assert!(json.contains("\"P1\""));
    }
}
