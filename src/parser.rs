use anyhow::{anyhow, bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{ConnId, ObjId, Pt, ShapeKind};

static SEG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\((-?\d+),(-?\d+)\)-\((-?\d+),(-?\d+)\)$").expect("segment regex"));
static CONN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^C(\d+)$").expect("connector regex"));
static SEG_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^C(\d+):(\d+)$").expect("segment-ref regex"));

/// One line of an edit script.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Grid { x: i32, y: i32, snap: Option<bool> },
    AddObject { kind: ShapeKind, start: Pt, end: Pt },
    AddPort { obj: ObjId, pos: Pt },
    DrawWire { segs: Vec<(Pt, Pt)> },
    MoveObj { objs: Vec<ObjId>, dx: i32, dy: i32 },
    MoveConn { conns: Vec<ConnId>, dx: i32, dy: i32 },
    MoveSeg { refs: Vec<(ConnId, usize)>, dx: i32, dy: i32 },
    DragSeg { refs: Vec<(ConnId, usize)>, dx: i32, dy: i32 },
    Group { objs: Vec<ObjId> },
    RemoveConn(ConnId),
    RemoveObj(ObjId),
}

/// Parse a line-oriented edit script. Blank lines and `#` comments are
/// skipped; anything else must be a known command.
pub fn parse_script(input: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for (lineno, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command = parse_line(line)
            .map_err(|err| anyhow!("line {}: {err}", lineno + 1))?;
        commands.push(command);
    }
    Ok(commands)
}

fn parse_line(line: &str) -> Result<Command> {
    let mut tokens = line.split_whitespace();
    let head = tokens.next().unwrap_or("");
    let rest: Vec<&str> = tokens.collect();

    match head {
        "grid" => {
            if rest.len() < 2 {
                bail!("grid needs X and Y");
            }
            let snap = match rest.get(2) {
                None => None,
                Some(&"on") => Some(true),
                Some(&"off") => Some(false),
                Some(other) => bail!("grid snap must be 'on' or 'off', got '{other}'"),
            };
            Ok(Command::Grid {
                x: num(rest[0])?,
                y: num(rest[1])?,
                snap,
            })
        }
        "obj" => {
            if rest.len() != 5 {
                bail!("obj needs SHAPE X1 Y1 X2 Y2");
            }
            let kind = ShapeKind::from_token(rest[0])
                .ok_or_else(|| anyhow!("unknown shape '{}'", rest[0]))?;
            Ok(Command::AddObject {
                kind,
                start: Pt::new(num(rest[1])?, num(rest[2])?),
                end: Pt::new(num(rest[3])?, num(rest[4])?),
            })
        }
        "port" => {
            if rest.len() != 3 {
                bail!("port needs OBJ X Y");
            }
            Ok(Command::AddPort {
                obj: ObjId(num(rest[0])? as u32),
                pos: Pt::new(num(rest[1])?, num(rest[2])?),
            })
        }
        "wire" => {
            if rest.is_empty() {
                bail!("wire needs at least one segment");
            }
            let mut segs = Vec::with_capacity(rest.len());
            for token in rest {
                let caps = SEG_RE
                    .captures(token)
                    .ok_or_else(|| anyhow!("bad segment '{token}', expected (x,y)-(x,y)"))?;
                segs.push((
                    Pt::new(num(&caps[1])?, num(&caps[2])?),
                    Pt::new(num(&caps[3])?, num(&caps[4])?),
                ));
            }
            Ok(Command::DrawWire { segs })
        }
        "moveobj" => {
            let (list, dx, dy) = list_and_offset(&rest)?;
            Ok(Command::MoveObj {
                objs: parse_obj_list(list)?,
                dx,
                dy,
            })
        }
        "moveconn" => {
            let (list, dx, dy) = list_and_offset(&rest)?;
            Ok(Command::MoveConn {
                conns: parse_conn_list(list)?,
                dx,
                dy,
            })
        }
        "moveseg" => {
            let (list, dx, dy) = list_and_offset(&rest)?;
            Ok(Command::MoveSeg {
                refs: parse_seg_refs(list)?,
                dx,
                dy,
            })
        }
        "dragseg" => {
            let (list, dx, dy) = list_and_offset(&rest)?;
            Ok(Command::DragSeg {
                refs: parse_seg_refs(list)?,
                dx,
                dy,
            })
        }
        "group" => {
            if rest.len() != 1 {
                bail!("group needs a comma-separated object list");
            }
            Ok(Command::Group {
                objs: parse_obj_list(rest[0])?,
            })
        }
        "removeconn" => {
            if rest.len() != 1 {
                bail!("removeconn needs a connector id");
            }
            Ok(Command::RemoveConn(parse_conn(rest[0])?))
        }
        "removeobj" => {
            if rest.len() != 1 {
                bail!("removeobj needs an object id");
            }
            Ok(Command::RemoveObj(ObjId(num(rest[0])? as u32)))
        }
        other => bail!("unknown command '{other}'"),
    }
}

fn num(token: &str) -> Result<i32> {
    token
        .parse::<i32>()
        .map_err(|_| anyhow!("expected a number, got '{token}'"))
}

fn list_and_offset<'a>(rest: &[&'a str]) -> Result<(&'a str, i32, i32)> {
    if rest.len() != 3 {
        bail!("expected LIST DX DY");
    }
    Ok((rest[0], num(rest[1])?, num(rest[2])?))
}

fn parse_obj_list(list: &str) -> Result<Vec<ObjId>> {
    list.split(',')
        .map(|t| num(t).map(|n| ObjId(n as u32)))
        .collect()
}

fn parse_conn(token: &str) -> Result<ConnId> {
    let caps = CONN_RE
        .captures(token)
        .ok_or_else(|| anyhow!("bad connector id '{token}', expected C<n>"))?;
    Ok(ConnId(caps[1].parse()?))
}

fn parse_conn_list(list: &str) -> Result<Vec<ConnId>> {
    list.split(',').map(parse_conn).collect()
}

fn parse_seg_refs(list: &str) -> Result<Vec<(ConnId, usize)>> {
    list.split(',')
        .map(|token| {
            let caps = SEG_REF_RE
                .captures(token)
                .ok_or_else(|| anyhow!("bad segment ref '{token}', expected C<n>:<idx>"))?;
            Ok((ConnId(caps[1].parse()?), caps[2].parse()?))
        })
        .collect()
}
