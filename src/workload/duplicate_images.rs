//! Finds images with identical pixel content.
//!
//! Inputs are list files naming one image path per line. Every image is
//! sent to the reducer for its pixel array, which emits the names of all
//! images sharing it.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Parser;
use log::debug;

use crate::format::{Format, Image, Record, Source};
use crate::standalone::engine::{self, MapContext, ReduceContext};
use crate::{utils, Job, Value};

pub const FORMAT: Format = Format::Image;

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    /// Only report images that have at least one duplicate
    #[clap(long)]
    only_duplicates: bool,
}

pub struct Duplicates {
    only_duplicates: bool,
}

impl Duplicates {
    pub fn new(only_duplicates: bool) -> Self {
        Self { only_duplicates }
    }

    pub fn map(&self, record: Record, cx: &mut MapContext<Vec<u8>, String, Value>) -> Result<()> {
        let Image { name, pixels } = match record {
            Record::Image(image) => image,
            other => bail!("duplicate finder reads images, got {other:?}"),
        };
        cx.emit_intermediate(pixels, name);
        Ok(())
    }

    pub fn reduce(&self, _pixels: &[u8], names: Vec<String>, cx: &mut ReduceContext<Value>) -> Result<()> {
        if self.only_duplicates && names.len() < 2 {
            return Ok(());
        }
        cx.emit(Value::from(names.join(",")));
        Ok(())
    }
}

/// Loads every image named in `list`, in order.
///
/// The raw bytes of a file are its pixel array.
pub fn load_images(list: &Source) -> Result<Vec<Image>> {
    let images = list
        .read_to_string()?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|name| -> Result<Image> {
            Ok(Image {
                name: name.to_string(),
                pixels: utils::read_bytes(Path::new(name))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("loaded {} images listed in `{}`", images.len(), list.name());
    Ok(images)
}

pub fn run(job: &Job) -> Result<Vec<Value>> {
    let args: Args = job.parse_args()?;
    let duplicates = Duplicates::new(args.only_duplicates);

    let mut images = Vec::new();
    for list in &job.inputs {
        images.extend(load_images(list)?);
    }

    Ok(engine::run(
        job.mode,
        [Source::Images(images)],
        FORMAT,
        |record, cx| duplicates.map(record, cx),
        |pixels, names, cx| duplicates.reduce(pixels, names, cx),
    )?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs;

    use super::*;
    use crate::format::Records;
    use crate::standalone::engine::perform_map;

    fn image(name: &str, pixels: &[u8]) -> Image {
        Image {
            name: name.to_string(),
            pixels: pixels.to_vec(),
        }
    }

    #[test]
    fn identical_pixels_share_a_key() {
        let duplicates = Duplicates::new(false);
        let images = vec![image("f1", &[1, 2, 3]), image("f2", &[1, 2, 3])];
        let cx = perform_map(Records::new([Source::Images(images)], FORMAT), &|record, cx| {
            duplicates.map(record, cx)
        })
        .unwrap();

        assert_eq!(cx.store().len(), 1);
        assert_eq!(
            cx.store().values_for(&vec![1, 2, 3]),
            Some(&["f1".to_string(), "f2".to_string()][..])
        );
    }

    #[test]
    fn unique_images_are_optional() {
        let images = vec![
            image("f1", &[1, 2, 3]),
            image("f2", &[9]),
            image("f3", &[1, 2, 3]),
        ];
        let find = |only_duplicates| {
            let duplicates = Duplicates::new(only_duplicates);
            engine::execute(
                [Source::Images(images.clone())],
                FORMAT,
                |record, cx| duplicates.map(record, cx),
                |pixels, names, cx| duplicates.reduce(pixels, names, cx),
            )
            .unwrap()
            .iter()
            .map(Value::to_string)
            .collect::<HashSet<_>>()
        };

        assert_eq!(find(false), HashSet::from(["f1,f3", "f2"].map(String::from)));
        assert_eq!(find(true), HashSet::from(["f1,f3".to_string()]));
    }

    #[test]
    fn reads_image_lists_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut names = Vec::new();
        for (file, bytes) in [("a.png", &b"same"[..]), ("b.png", &b"same"[..]), ("c.png", &b"other"[..])] {
            let path = dir.path().join(file);
            fs::write(&path, bytes).unwrap();
            names.push(path.display().to_string());
        }
        let list = dir.path().join("images.txt");
        fs::write(&list, names.join("\n")).unwrap();

        let job = Job::new("duplicate-images", vec![Source::File(list)]).with_args(["--only-duplicates"]);
        assert_eq!(
            run(&job).unwrap(),
            vec![Value::from(format!("{},{}", names[0], names[1]))]
        );
    }

    #[test]
    fn missing_images_fail_the_job() {
        let job = Job::new(
            "duplicate-images",
            vec![Source::inline("images.txt", "/no/such/image.png\n")],
        );
        assert!(run(&job).is_err());
    }
}
