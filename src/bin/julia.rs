extern crate clap;
extern crate env_logger;
extern crate failure;
extern crate image;
extern crate julia;
#[macro_use]
extern crate log;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use failure::{err_msg, Error};
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;
use julia::{substitute_background, ColorSample, Complex, Dispatcher, RenderRequest};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

/// RRGGBB, with or without a leading '#'.
fn parse_color(s: &str) -> Option<ColorSample> {
    let s = s.trim_start_matches('#');
    if s.len() != 6 {
        return None;
    }
    match u32::from_str_radix(s, 16) {
        Ok(v) => Some(ColorSample::new(
            (v >> 16) as u8,
            ((v >> 8) & 0xFF) as u8,
            (v & 0xFF) as u8,
        )),
        Err(_) => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const CONSTANT: &str = "constant";
const XLIMITS: &str = "xlimits";
const YLIMITS: &str = "ylimits";
const ITERATIONS: &str = "iterations";
const RADIUS: &str = "radius";
const TILES: &str = "tiles";
const THREADS: &str = "threads";
const BACKGROUND: &str = "background";
const PROBE: &str = "probe";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("julia")
        .version("0.1.0")
        .about("Julia set renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required_unless(PROBE)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file (binary PPM)"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(CONSTANT)
                .long(CONSTANT)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-0.8,0.156")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse the constant"))
                .help("The constant c, as RE,IM"),
        )
        .arg(
            Arg::with_name(XLIMITS)
                .long(XLIMITS)
                .short("x")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-1.6,1.6")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse the real limits"))
                .help("Real-axis limits, as MIN,MAX"),
        )
        .arg(
            Arg::with_name(YLIMITS)
                .long(YLIMITS)
                .short("y")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-1.2,1.2")
                .validator(|s| {
                    validate_pair::<f64>(&s, ',', "Could not parse the imaginary limits")
                })
                .help("Imaginary-axis limits, as MIN,MAX"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("300")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Maximum iterations per pixel"),
        )
        .arg(
            Arg::with_name(RADIUS)
                .long(RADIUS)
                .short("r")
                .takes_value(true)
                .default_value("2")
                .validator(|s| {
                    validate_range(
                        &s,
                        ::std::f64::MIN_POSITIVE,
                        ::std::f64::MAX,
                        "Could not parse escape radius",
                        "Escape radius must be positive",
                    )
                })
                .help("Escape radius"),
        )
        .arg(
            Arg::with_name(TILES)
                .long(TILES)
                .short("t")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        65_536,
                        "Could not parse tile count",
                        "Tile count must be between 1 and 65536",
                    )
                })
                .help("Number of tiles to cut the frame into [default: one per thread]"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("j")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to use in solver [default: one per CPU]"),
        )
        .arg(
            Arg::with_name(BACKGROUND)
                .long(BACKGROUND)
                .short("b")
                .takes_value(true)
                .default_value("ffffff")
                .validator(|s| match parse_color(&s) {
                    Some(_) => Ok(()),
                    None => Err("Background must be six hex digits, RRGGBB".to_string()),
                })
                .help("Colour for pixels the palette leaves pure black"),
        )
        .arg(
            Arg::with_name(PROBE)
                .long(PROBE)
                .short("p")
                .takes_value(true)
                .validator(|s| validate_pair::<usize>(&s, ',', "Could not parse probe pixel"))
                .help("Print the colour of one pixel, as X,Y, and exit"),
        )
        .get_matches()
}

fn write_image(outfile: &str, pixels: &[u8], bounds: (usize, usize)) -> Result<(), Error> {
    let path = Path::new(outfile);
    let output = File::create(&path)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Pixmap(SampleEncoding::Binary));
    encoder.encode(pixels, bounds.0 as u32, bounds.1 as u32, ColorType::RGB(8))?;
    Ok(())
}

// Validators have already run, so the parses below only fail on
// values clap let through that we still cannot use.
fn value<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, Error> {
    matches
        .value_of(name)
        .ok_or_else(|| err_msg(format!("Missing value for {}", name)))
}

fn request(matches: &ArgMatches) -> Result<RenderRequest, Error> {
    let size: (usize, usize) =
        parse_pair(value(matches, SIZE)?, 'x').ok_or_else(|| err_msg("Error parsing image size"))?;
    let c = parse_complex(value(matches, CONSTANT)?)
        .ok_or_else(|| err_msg("Error parsing the constant"))?;
    let x_limits =
        parse_pair(value(matches, XLIMITS)?, ',').ok_or_else(|| err_msg("Error parsing x limits"))?;
    let y_limits =
        parse_pair(value(matches, YLIMITS)?, ',').ok_or_else(|| err_msg("Error parsing y limits"))?;
    let iterations = usize::from_str(value(matches, ITERATIONS)?)?;
    let radius = f64::from_str(value(matches, RADIUS)?)?;
    Ok(RenderRequest::new(
        size.0, size.1, c, iterations, radius, x_limits, y_limits,
    )?)
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let request = request(matches)?;

    if let Some(p) = matches.value_of(PROBE) {
        let (x, y): (usize, usize) =
            parse_pair(p, ',').ok_or_else(|| err_msg("Error parsing probe pixel"))?;
        let probe = julia::probe(x, y, &request)?;
        println!(
            "{} {} {} {} {}",
            probe.x, probe.y, probe.color.r, probe.color.g, probe.color.b
        );
        return Ok(());
    }

    let dispatcher = match matches.value_of(THREADS) {
        Some(t) => Dispatcher::new(usize::from_str(t)?),
        None => Dispatcher::default(),
    };
    let tiles = match matches.value_of(TILES) {
        Some(t) => usize::from_str(t)?,
        None => dispatcher.workers(),
    };
    let background =
        parse_color(value(matches, BACKGROUND)?).ok_or_else(|| err_msg("Error parsing background"))?;

    let mut frame = dispatcher.render(&request, tiles)?;
    let replaced = substitute_background(frame.pixels_mut(), background);
    debug!("Substituted background for {} pixels", replaced);

    let outfile = value(matches, OUTPUT)?;
    write_image(outfile, &frame.to_rgb_bytes(), (frame.width(), frame.height()))?;
    info!("Wrote {}", outfile);
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
