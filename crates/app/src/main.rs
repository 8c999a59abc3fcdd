//! Entry point for the scene viewer.

use std::path::PathBuf;

use anyhow::Result;
use platform::ViewerConfig;

fn parse_backend(val: &str) -> wgpu::Backends {
    // Accept: auto|vulkan|dx12|metal|gl
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> ViewerConfig {
    let mut config = ViewerConfig::default();
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--gpu-backend=") {
            config.backends = parse_backend(v);
        } else if let Some(v) = arg.strip_prefix("--size=") {
            match v
                .split_once('x')
                .or_else(|| v.split_once('X'))
                .map(|(sw, sh)| (sw.parse::<u32>(), sh.parse::<u32>()))
            {
                Some((Ok(pw), Ok(ph))) => {
                    w = Some(pw);
                    h = Some(ph);
                }
                _ => log::warn!("Ignoring malformed --size='{}'", v),
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        } else if let Some(v) = arg.strip_prefix("--assets=") {
            config.asset_root = PathBuf::from(v);
        } else if let Some(v) = arg.strip_prefix("--texture-ext=") {
            config.texture_extension = v.trim_start_matches('.').to_owned();
        }
    }

    config.width = w.unwrap_or(config.width).max(1);
    config.height = h.unwrap_or(config.height).max(1);
    config
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = parse_args(std::env::args().skip(1));
    log::info!(
        "Starting scene viewer. Backend: {:?}, window_size={}x{}, assets={}",
        config.backends,
        config.width,
        config.height,
        config.asset_root.display()
    );

    platform::run(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
