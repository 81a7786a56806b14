//! Ricochet demo entry point
//!
//! Drops a handful of bodies into an arena with a few obstacle segments and
//! logs every collision. Pass a JSON config path to override the defaults.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Ricochet (native) starting...");

    if let Err(e) = demo::run(std::env::args().nth(1)) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The engine is a library on the web; there is nothing to run here
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use glam::DVec2;

    use ricochet::sim::{Environment, Line, LineTag, Wall};
    use ricochet::{EngineError, EngineResult, EnvironmentConfig};

    const TICKS: u32 = 2000;

    pub fn run(config_path: Option<String>) -> EngineResult<()> {
        let config = match config_path {
            Some(path) => {
                let json = std::fs::read_to_string(&path).map_err(|e| {
                    EngineError::InvalidConfig(format!("{}: {}", path, e))
                })?;
                EnvironmentConfig::from_json(&json)?
            }
            None => EnvironmentConfig {
                step_size: 0.01,
                ..EnvironmentConfig::default()
            },
        };

        let mut env = Environment::new(config)?;
        let (w, h) = (env.config().width, env.config().height);

        // Two bricks, each a closed square of four segments
        let mut segments = Vec::new();
        for (owner, corner) in [(1u64, DVec2::new(w * 0.25, h * 0.6)), (2, DVec2::new(w * 0.6, h * 0.7))] {
            let pts = [
                corner,
                corner + DVec2::new(1.0, 0.0),
                corner + DVec2::new(1.0, 1.0),
                corner + DVec2::new(0.0, 1.0),
            ];
            for i in 0..4 {
                segments.push(Line::obstacle(pts[i], pts[(i + 1) % 4], owner)?);
            }
        }
        env.set_segments(segments)?;

        let origin = DVec2::new(w / 2.0, 0.2);
        let aim = DVec2::new(0.6, 1.0);
        let preview = env.preview_trajectory(origin, aim, 0.15, 8, |line| {
            line.tag == LineTag::Boundary(Wall::Bottom)
        })?;
        log::info!("Aim preview: {:?}", preview);

        for i in 0..5 {
            let dir = DVec2::from_angle(i as f64 * 0.1).rotate(aim);
            env.add_body(origin, dir * 2.0, 0.15)?;
        }

        let mut hits_per_brick = [0u32; 3];
        for _ in 0..TICKS {
            let report = env.tick();
            for event in &report.collisions {
                if let LineTag::Obstacle(owner) = event.tag {
                    hits_per_brick[owner as usize] += 1;
                    log::info!("Body {} hit brick {} at {}", event.body, owner, event.touch_point);
                    // Bricks break after three hits
                    if hits_per_brick[owner as usize] == 3 {
                        env.remove_obstacle(owner);
                        log::info!("Brick {} destroyed", owner);
                    }
                }
            }
            for handle in &report.evicted {
                log::warn!("Body {} evicted", handle);
            }
        }

        log::info!(
            "Simulated {:.2} time units, {} bodies left",
            env.time(),
            env.bodies().len()
        );
        Ok(())
    }
}
