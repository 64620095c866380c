use crate::canvas_dump::{dump_to_string, write_canvas_dump};
use crate::config::{load_config, Config, GridConfig};
use crate::engine;
use crate::engine::router::OrthoRouter;
use crate::model::Canvas;
use crate::parser::{parse_script, Command};
use anyhow::Result;
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "wiregrid", version, about = "Grid-snapped schematic wiring canvas")]
pub struct Args {
    /// Input edit script or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output JSON dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file (grid and router settings)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let commands = parse_script(&input)?;

    let mut canvas = Canvas::new(config.grid);
    for command in commands {
        apply_command(&mut canvas, &config, command)?;
    }

    match args.output {
        Some(path) => write_canvas_dump(&path, &canvas)?,
        None => println!("{}", dump_to_string(&canvas)?),
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

pub fn apply_command(canvas: &mut Canvas, config: &Config, command: Command) -> Result<()> {
    let final_router = OrthoRouter::new(config.router.final_mode);
    match command {
        Command::Grid { x, y, snap } => {
            canvas.grid = GridConfig {
                x,
                y,
                snap: snap.unwrap_or(canvas.grid.snap),
            };
        }
        Command::AddObject { kind, start, end } => {
            canvas.add_object(kind, start, end);
        }
        Command::AddPort { obj, pos } => {
            engine::add_port(canvas, obj, pos)?;
        }
        Command::DrawWire { segs } => {
            engine::draw_connector(canvas, &segs)?;
        }
        Command::MoveObj { objs, dx, dy } => {
            engine::move_obj(canvas, &objs, dx, dy, &final_router, config.router.final_jump)?;
        }
        Command::MoveConn { conns, dx, dy } => {
            engine::move_conn(canvas, &conns, dx, dy)?;
        }
        Command::MoveSeg { refs, dx, dy } => {
            engine::move_segment(canvas, &refs, dx, dy)?;
        }
        Command::DragSeg { refs, dx, dy } => {
            engine::drag_segment(
                canvas,
                &refs,
                dx,
                dy,
                &final_router,
                config.router.final_jump,
            )?;
        }
        Command::Group { objs } => {
            engine::group_objects(canvas, &objs)?;
        }
        Command::RemoveConn(id) => {
            engine::remove_conn(canvas, id)?;
        }
        Command::RemoveObj(id) => {
            engine::remove_obj(canvas, id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_a_script_end_to_end() {
        let config = Config::default();
        let mut canvas = Canvas::new(config.grid);
        let script = "\
obj rect 200 40 300 200
port 1 300 130
wire (300,130)-(500,130) (500,130)-(500,220)
";
        for command in parse_script(script).unwrap() {
            apply_command(&mut canvas, &config, command).unwrap();
        }
        assert_eq!(canvas.objects.len(), 1);
        assert_eq!(canvas.ports.len(), 1);
        assert_eq!(canvas.conns.len(), 1);
        assert_eq!(canvas.conns[0].ports.len(), 1);
    }

    #[test]
    fn engine_errors_surface_with_context() {
        let config = Config::default();
        let mut canvas = Canvas::new(config.grid);
        let commands = parse_script("removeconn C9").unwrap();
        let err = apply_command(&mut canvas, &config, commands[0].clone()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
