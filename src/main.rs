use std::{process::ExitCode, rc::Rc};

use sdl2::{
    event::{Event, WindowEvent},
    keyboard::Keycode,
};
use skyview::{
    abs::{GlBackend, Gpu, HeadlessBackend, RenderContext},
    config::{Args, Settings, USAGE},
    controls::{Action, InputState},
    logging,
    render::{
        camera::Movement,
        frame::{FrameClock, FrameRenderer},
        overlay::{CrosshairOverlay, LogOverlay, NoOverlay, Overlay},
    },
};

use crate::app::App;

mod app;

/// Frame time used by headless runs, which have no display to pace them.
const HEADLESS_DELTA: f32 = 1.0 / 60.0;

fn main() -> ExitCode {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };
    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let settings = match Settings::load_or_default(args.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if args.print_settings {
        return match settings.to_json() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    logging::init(settings.log_level());

    let result = match args.headless {
        Some(frames) => run_headless(&settings, frames),
        None => run(&settings),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn movement(keycode: Keycode) -> Option<Movement> {
    match keycode {
        Keycode::W => Some(Movement::Forward),
        Keycode::S => Some(Movement::Backward),
        Keycode::A => Some(Movement::Left),
        Keycode::D => Some(Movement::Right),
        _ => None,
    }
}

fn action(keycode: Keycode) -> Option<Action> {
    match keycode {
        Keycode::C => Some(Action::ToggleCursor),
        Keycode::T => Some(Action::ToggleWireframe),
        Keycode::R => Some(Action::ReloadShaders),
        Keycode::Escape => Some(Action::Quit),
        _ => None,
    }
}

fn run(settings: &Settings) -> Result<(), String> {
    let mut app = App::new(&settings.window)?;
    let gpu: Gpu = Rc::new(GlBackend::new(&app.gl));
    log::info!("rendering with {}", gpu.name());

    let (width, height) = app.drawable_size();
    let mut ctx = RenderContext::new(&gpu, width, height);
    let mut renderer = FrameRenderer::new(&gpu, settings)?;
    let mut overlay: Box<dyn Overlay> = if settings.render.crosshair {
        Box::new(CrosshairOverlay::new(&gpu).map_err(|e| e.to_string())?)
    } else {
        Box::new(NoOverlay)
    };

    let mut input = InputState::default();
    let mut clock = FrameClock::new();
    let mut title_timer = 0.0;

    'running: loop {
        let delta_time = clock.tick();
        input.begin_frame();

        for event in app.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => input.trigger(Action::Quit),
                Event::Window {
                    win_event: WindowEvent::SizeChanged(..),
                    ..
                } => {
                    let (width, height) = app.window.drawable_size();
                    ctx.resize(width, height);
                }
                Event::KeyDown {
                    keycode: Some(keycode),
                    repeat,
                    ..
                } => {
                    if let Some(movement) = movement(keycode) {
                        input.press(movement);
                    } else if !repeat && let Some(action) = action(keycode) {
                        input.trigger(action);
                    }
                }
                Event::KeyUp {
                    keycode: Some(keycode),
                    ..
                } => {
                    if let Some(movement) = movement(keycode) {
                        input.release(movement);
                    }
                }
                // SDL's y grows downwards, the camera's pitch grows upwards.
                Event::MouseMotion { xrel, yrel, .. } => {
                    input.mouse_moved(xrel as f32, -yrel as f32)
                }
                Event::MouseWheel { precise_y, .. } => input.scrolled(precise_y),
                _ => {}
            }
        }

        let requests = renderer.update(&input, delta_time);
        if let Some(locked) = requests.cursor_locked {
            app.set_cursor_locked(locked);
        }
        if requests.quit {
            break 'running;
        }

        renderer.render(&mut ctx, &mut overlay, delta_time);
        app.window.gl_swap_window();

        title_timer += delta_time;
        if title_timer >= 0.5 {
            title_timer = 0.0;
            let title = format!(
                "{} - FPS: {:.0}",
                settings.window.title,
                renderer.stats().fps
            );
            if let Err(e) = app.window.set_title(&title) {
                log::warn!("could not set window title: {e}");
            }
        }
    }

    log::info!("bye");
    Ok(())
}

/// Renders `frames` frames on a [`HeadlessBackend`] and reports what was drawn.
fn run_headless(settings: &Settings, frames: u64) -> Result<(), String> {
    let headless = Rc::new(HeadlessBackend::new());
    let gpu: Gpu = headless.clone();
    log::info!("rendering {frames} frames with {}", gpu.name());

    let mut ctx = RenderContext::new(&gpu, settings.window.width, settings.window.height);
    let mut renderer = FrameRenderer::new(&gpu, settings)?;
    let mut overlay = LogOverlay::new(60);
    let input = InputState::default();

    let mut draws = 0;
    for _ in 0..frames {
        let requests = renderer.update(&input, HEADLESS_DELTA);
        if requests.quit {
            break;
        }
        renderer.render(&mut ctx, &mut overlay, HEADLESS_DELTA);
        draws += headless.take_draws().len();
    }

    log::info!(
        "rendered {frames} frames, {draws} draws, {} live device objects",
        headless.live_objects()
    );
    Ok(())
}
