use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use albertox3_core::colors;
use albertox3_core::translations::Args;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use poise::serenity_prelude::{CreateAttachment, CreateEmbed, User};
use poise::CreateReply;

use crate::utils::{embed, find_user, translator, UserError};
use crate::{Context, Data, Error, Scale};

pub const CREATED: u32 = colors::NEPHRITIS;

/// Edge length of patterns and generated pictures.
const SIZE: u32 = 4096;
const DEFAULT_OPACITY: f32 = 50.0;
// Discord ratelimits message edits.
const EDIT_DELAY: Duration = Duration::from_millis(400);

const UKRAINE: &[[u8; 3]] = &[[0, 91, 188], [255, 214, 0]];
const RAINBOW: &[[u8; 3]] = &[
    [228, 3, 3],
    [255, 140, 0],
    [255, 237, 0],
    [0, 128, 38],
    [0, 77, 255],
    [117, 7, 135],
];

const FLAGS: [(&str, &[[u8; 3]]); 2] = [("ukraine", UKRAINE), ("rainbow", RAINBOW)];

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "misc",
        name: "profile",
        commands: || vec![profile()],
        subscribe: None,
    }
}

#[must_use]
pub fn pattern_folder(data: &Data) -> PathBuf {
    data.config.scales_folder.join("profile").join("patterns")
}

/// Flag of equally high horizontal stripes.
#[must_use]
pub fn striped_flag(stripes: &[[u8; 3]], size: u32) -> RgbaImage {
    let count = stripes.len().max(1) as u32;
    let height = (size / count).max(1);
    RgbaImage::from_fn(size, size, |_, y| {
        let index = (y / height).min(count - 1) as usize;
        let [r, g, b] = stripes.get(index).copied().unwrap_or_default();
        Rgba([r, g, b, 255])
    })
}

/// Writes every flag into the pattern folder.
pub async fn create_all_flags(data: &Data) -> Result<(), Error> {
    let folder = pattern_folder(data);
    tokio::task::spawn_blocking(move || write_flags(&folder)).await??;
    Ok(())
}

fn write_flags(folder: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(folder)?;
    for (name, stripes) in FLAGS {
        tracing::debug!("Creating flag {name}");
        striped_flag(stripes, SIZE).save(folder.join(format!("{name}.png")))?;
    }
    Ok(())
}

/// Names of the available patterns, sorted.
pub async fn available_patterns(folder: &Path) -> Result<Vec<String>, Error> {
    let mut patterns = Vec::new();
    let mut entries = tokio::fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "png") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                patterns.push(stem.to_owned());
            }
        }
    }
    patterns.sort_unstable();
    Ok(patterns)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProfileArgs {
    pub user: Option<String>,
    pub opacity: Option<String>,
}

/// Splits the arguments after the pattern, `user::<who>` and `user:: <who>` may appear anywhere.
#[must_use]
pub fn parse_args(raw: &str) -> ProfileArgs {
    let mut args: Vec<&str> = raw.split_whitespace().collect();
    let mut user = None;

    if let Some(i) = args.iter().position(|a| a.starts_with("user::")) {
        let arg = args.remove(i);
        user = match arg.strip_prefix("user::") {
            Some("") if i < args.len() => Some(args.remove(i).to_owned()),
            Some("") | None => None,
            Some(who) => Some(who.to_owned()),
        };
    }

    ProfileArgs {
        user,
        opacity: args.first().map(|o| (*o).to_owned()),
    }
}

/// Opacity in percent, plain decimal numbers between 0 and 100 only.
#[must_use]
pub fn parse_opacity(raw: &str) -> Option<f32> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let well_formed = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1
        && digits.chars().any(|c| c.is_ascii_digit());
    if !well_formed {
        return None;
    }

    raw.parse::<f32>()
        .ok()
        .filter(|o| (0.0..=100.0).contains(o))
}

/// Linear interpolation of every channel, `alpha` 0 keeps `base`, 1 gives `overlay`.
#[must_use]
pub fn blend(base: &RgbaImage, overlay: &RgbaImage, alpha: f32) -> RgbaImage {
    let alpha = alpha.clamp(0.0, 1.0);
    RgbaImage::from_fn(base.width(), base.height(), |x, y| {
        let a = base.get_pixel(x, y).0;
        let b = overlay
            .get_pixel_checked(x, y)
            .map_or([0; 4], |p| p.0);
        let mut out = [0u8; 4];
        for (o, (a, b)) in out.iter_mut().zip(a.into_iter().zip(b)) {
            let value = f32::from(a) + (f32::from(b) - f32::from(a)) * alpha;
            *o = value.round().clamp(0.0, 255.0) as u8;
        }
        Rgba(out)
    })
}

/// Greyscale avatar with the pattern laid over it, encoded as png.
fn compose(avatar: &[u8], pattern: &Path, opacity: f32) -> Result<Vec<u8>, Error> {
    let profile = image::load_from_memory(avatar)?;
    let profile = DynamicImage::ImageLumaA8(profile.to_luma_alpha8()).to_rgba8();
    let profile = imageops::resize(&profile, SIZE, SIZE, FilterType::Triangle);

    let pattern = image::open(pattern)?.to_rgba8();
    let pattern = imageops::resize(&pattern, SIZE, SIZE, FilterType::Triangle);

    let result = blend(&profile, &pattern, opacity / 100.0);
    let mut png = Vec::new();
    result.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

fn avatar_url(user: &User) -> String {
    let face = user.face();
    let base = face.split('?').next().unwrap_or(&face);
    format!("{base}?size={SIZE}")
}

/// Lays a pattern over a greyscale profile picture.
#[poise::command(prefix_command, category = "Misc")]
pub async fn profile(
    ctx: Context<'_>,
    pattern: Option<String>,
    #[rest] rest: Option<String>,
) -> Result<(), Error> {
    let t = translator(ctx, "profile");
    let data = ctx.data();
    let folder = pattern_folder(data);

    let pattern = pattern.unwrap_or_default();
    let args = parse_args(rest.as_deref().unwrap_or_default());

    let available = available_patterns(&folder).await?;
    if !available.contains(&pattern) {
        let message = t.format(
            "invalid_pattern",
            &Args::new()
                .with("available", available.join(", "))
                .with("given", &pattern),
        )?;
        return Err(UserError::Assertion(message).into());
    }

    let raw_opacity = args.opacity.unwrap_or_else(|| DEFAULT_OPACITY.to_string());
    let Some(opacity) = parse_opacity(&raw_opacity) else {
        return Err(UserError::Assertion(t.text("invalid_opacity")?).into());
    };

    let user = match args.user {
        Some(who) => find_user(ctx, &who).await,
        None => Some(ctx.author().clone()),
    };
    let Some(user) = user else {
        let message = translator(ctx, "g").text("not_found.user")?;
        return Err(UserError::Assertion(message).into());
    };

    let base = embed(ctx, CREATED)?;
    let progress = |description: String| CreateReply::default().embed(base.clone().description(description));

    let handle = ctx
        .send(progress(t.text("progress.downloading")?).reply(true))
        .await?;
    let avatar = data
        .reqwest
        .get(avatar_url(&user))
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    tokio::time::sleep(EDIT_DELAY).await;
    handle
        .edit(ctx, progress(t.text("progress.preparing.profile")?))
        .await?;
    tokio::time::sleep(EDIT_DELAY).await;
    handle
        .edit(
            ctx,
            progress(t.format("progress.preparing.pattern", &Args::new().with("pattern", &pattern))?),
        )
        .await?;
    tokio::time::sleep(EDIT_DELAY).await;
    handle
        .edit(ctx, progress(t.text("progress.creating")?))
        .await?;

    let pattern_path = folder.join(format!("{pattern}.png"));
    let png = tokio::task::spawn_blocking(move || compose(&avatar, &pattern_path, opacity)).await??;

    let filename = format!("{pattern}.png");
    let result: CreateEmbed = base
        .description(t.text("new_picture")?)
        .image(format!("attachment://{filename}"));
    handle
        .edit(
            ctx,
            CreateReply::default()
                .embed(result)
                .attachment(CreateAttachment::bytes(png, filename)),
        )
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_have_equal_stripes() {
        let flag = striped_flag(UKRAINE, 64);
        assert_eq!(flag.dimensions(), (64, 64));
        assert_eq!(flag.get_pixel(0, 0), &Rgba([0, 91, 188, 255]));
        assert_eq!(flag.get_pixel(63, 31), &Rgba([0, 91, 188, 255]));
        assert_eq!(flag.get_pixel(0, 32), &Rgba([255, 214, 0, 255]));

        let rainbow = striped_flag(RAINBOW, 60);
        assert_eq!(rainbow.get_pixel(5, 59), &Rgba([117, 7, 135, 255]));
        assert_eq!(rainbow.get_pixel(5, 10), &Rgba([255, 140, 0, 255]));
    }

    #[test]
    fn uneven_sizes_extend_the_last_stripe() {
        let rainbow = striped_flag(RAINBOW, 64);
        assert_eq!(rainbow.get_pixel(0, 63), &Rgba([117, 7, 135, 255]));
    }

    #[test]
    fn parses_user_anywhere() {
        assert_eq!(parse_args(""), ProfileArgs::default());
        assert_eq!(parse_args("80"), ProfileArgs {
            user: None,
            opacity: Some("80".into())
        });
        assert_eq!(parse_args("user::Albert 30"), ProfileArgs {
            user: Some("Albert".into()),
            opacity: Some("30".into())
        });
        assert_eq!(parse_args("30 user:: Albert"), ProfileArgs {
            user: Some("Albert".into()),
            opacity: Some("30".into())
        });
        assert_eq!(parse_args("user::"), ProfileArgs::default());
    }

    #[test]
    fn validates_opacity() {
        assert_eq!(parse_opacity("50"), Some(50.0));
        assert_eq!(parse_opacity("0"), Some(0.0));
        assert_eq!(parse_opacity("100"), Some(100.0));
        assert_eq!(parse_opacity("12.5"), Some(12.5));
        for invalid in ["", "-1", "100.1", "1.2.3", "abc", "1e2", ".", "NaN", "inf"] {
            assert_eq!(parse_opacity(invalid), None, "{invalid}");
        }
    }

    #[test]
    fn blends_linearly() {
        let black = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let white = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));

        assert_eq!(blend(&black, &white, 0.0), black);
        assert_eq!(blend(&black, &white, 1.0), white);
        assert_eq!(blend(&black, &white, 0.5).get_pixel(1, 1), &Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn writes_flags_to_folder() {
        let dir = tempfile::tempdir().unwrap();
        write_flags(dir.path()).unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let patterns = rt.block_on(available_patterns(dir.path())).unwrap();
        assert_eq!(patterns, ["rainbow", "ukraine"]);
    }
}
