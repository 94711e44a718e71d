//! 3x3 Gaussian blur
//!
//! The kernel is `[1 2 1; 2 4 2; 1 2 1] / 16`, rounded as `(sum + 8) / 16`. Pixels outside the
//! image take the value of the nearest edge pixel.
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::{Image, TaskKind},
};
use std::ops::Range;

const KERNEL: [[u32; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];

/// Geometry of an image without its pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Shape {
    width: usize,
    height: usize,
    channels: usize,
}

impl Shape {
    fn of(image: &Image) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            channels: image.channels(),
        }
    }

    fn row_len(&self) -> usize {
        self.width * self.channels
    }

    fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && (1..=4).contains(&self.channels)
    }
}

/// Blur the rows in `rows`
///
/// `src` holds the consecutive image rows starting at `src_first`; it must contain every row
/// within one of `rows` that lies inside the image.
fn blur_rows(src: &[u8], src_first: usize, shape: Shape, rows: Range<usize>) -> Vec<u8> {
    let Shape {
        width,
        height,
        channels,
    } = shape;
    let row_len = shape.row_len();
    let mut out = Vec::with_capacity(rows.len() * row_len);
    for r in rows {
        for c in 0..width {
            for ch in 0..channels {
                let mut sum = 0;
                for (dr, weights) in KERNEL.iter().enumerate() {
                    let sr = (r + dr).saturating_sub(1).min(height - 1) - src_first;
                    for (dc, w) in weights.iter().enumerate() {
                        let sc = (c + dc).saturating_sub(1).min(width - 1);
                        sum += w * u32::from(src[sr * row_len + sc * channels + ch]);
                    }
                }
                out.push(((sum + 8) / 16) as u8);
            }
        }
    }
    out
}

/// Gaussian blur on a single process
#[derive(Debug)]
pub struct GaussianBlurSeq {
    input: Image,
    output: Option<Image>,
}

impl GaussianBlurSeq {
    /// Create the task
    pub fn new(input: Image) -> Self {
        Self {
            input,
            output: None,
        }
    }
}

impl Task for GaussianBlurSeq {
    type Input = Image;
    type Output = Option<Image>;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &Image {
        &self.input
    }
    fn output(&self) -> &Option<Image> {
        &self.output
    }

    fn validation(&mut self) -> bool {
        self.input.is_consistent() && Shape::of(&self.input).is_valid()
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output = None;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let shape = Shape::of(&self.input);
        let pixels = blur_rows(self.input.pixels(), 0, shape, 0..shape.height);
        self.output = Some(Image::new(
            shape.width,
            shape.height,
            shape.channels,
            pixels,
        )?);
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_output(&self.input, &self.output)
    }
}

fn check_output(input: &Image, output: &Option<Image>) -> Result<()> {
    match output {
        Some(image) if Shape::of(image) == Shape::of(input) => Ok(()),
        _ => Err(Error::InvalidInput(
            "blurred image does not match the input shape".into(),
        )),
    }
}

/// Gaussian blur on bands of rows
///
/// The root sends every rank its band together with one halo row above and below. Bands are
/// gathered on the root and the image is broadcast.
#[derive(Debug)]
pub struct GaussianBlurDistributed<'a, C: Communicator> {
    comm: &'a C,
    input: Image,
    output: Option<Image>,
    shape: Option<Shape>,
}

impl<'a, C: Communicator> GaussianBlurDistributed<'a, C> {
    /// Create the task
    pub fn new(comm: &'a C, input: Image) -> Self {
        Self {
            comm,
            input,
            output: None,
            shape: None,
        }
    }
}

/// Rows a band needs to be blurred: the band plus one row on each side, clipped to the image
fn with_halo(band: &Range<usize>, height: usize) -> Range<usize> {
    if band.is_empty() {
        return band.start..band.start;
    }
    band.start.saturating_sub(1)..(band.end + 1).min(height)
}

impl<C: Communicator> Task for GaussianBlurDistributed<'_, C> {
    type Input = Image;
    type Output = Option<Image>;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &Image {
        &self.input
    }
    fn output(&self) -> &Option<Image> {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || {
            self.input.is_consistent() && Shape::of(&self.input).is_valid()
        })
    }

    fn pre_processing(&mut self) -> Result<()> {
        let comm = self.comm;
        let shape = Shape::of(&self.input);
        let mut dims = vec![shape.width, shape.height, shape.channels];
        comm.broadcast(&mut dims, ROOT)?;
        self.shape = Some(Shape {
            width: dims[0],
            height: dims[1],
            channels: dims[2],
        });
        self.output = None;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let shape = self.shape.ok_or(Error::NotPreProcessed)?;
        let row_len = shape.row_len();
        let bands = BlockDistribution::new(shape.height, comm.size());
        let halos = (0..comm.size())
            .map(|p| with_halo(&bands.range(p), shape.height))
            .collect::<Vec<_>>();

        let halo_counts = halos.iter().map(|h| h.len() * row_len).collect::<Vec<_>>();
        let sendbuf = if comm.is_root(ROOT) {
            halos
                .iter()
                .flat_map(|h| &self.input.pixels()[h.start * row_len..h.end * row_len])
                .copied()
                .collect()
        } else {
            vec![]
        };
        let local = comm.scatterv(&sendbuf, &halo_counts, ROOT)?;

        let rank = comm.rank();
        let band = bands.range(rank);
        tracing::trace!(rank, rows = band.len(), "blurring band");
        let blurred = blur_rows(&local, halos[rank].start, shape, band);

        let mut pixels = comm.gatherv(&blurred, bands.scaled(row_len).counts(), ROOT)?;
        comm.broadcast(&mut pixels, ROOT)?;
        self.output = Some(Image::new(
            shape.width,
            shape.height,
            shape.channels,
            pixels,
        )?);
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        match (&self.output, self.shape) {
            (Some(image), Some(shape)) if Shape::of(image) == shape => Ok(()),
            _ => Err(Error::InvalidInput(
                "blurred image does not match the input shape".into(),
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::LocalUniverse;
    use crate::runner::{run_pipeline, TaskRunner};

    fn single_bright_pixel() -> Image {
        let mut pixels = vec![0; 9];
        pixels[4] = 255;
        Image::new(3, 3, 1, pixels).unwrap()
    }

    fn pattern(width: usize, height: usize, channels: usize) -> Image {
        let pixels = (0..width * height * channels)
            .map(|i| ((i * 37 + i / 7 * 11) % 256) as u8)
            .collect();
        Image::new(width, height, channels, pixels).unwrap()
    }

    #[test]
    fn test_impulse_response() {
        let blurred = run_pipeline(GaussianBlurSeq::new(single_bright_pixel()))
            .unwrap()
            .unwrap();
        assert_eq!(blurred.pixels(), &[16, 32, 16, 32, 64, 32, 16, 32, 16]);
    }

    #[test]
    fn test_uniform_image_is_unchanged() {
        let image = Image::new(4, 5, 3, vec![200; 60]).unwrap();
        let blurred = run_pipeline(GaussianBlurSeq::new(image.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(blurred, image);
    }

    #[test]
    fn test_edge_replication() {
        let image = Image::new(2, 1, 1, vec![0, 160]).unwrap();
        let blurred = run_pipeline(GaussianBlurSeq::new(image)).unwrap().unwrap();
        // Row replication makes every column sum 4x its center value.
        assert_eq!(blurred.pixels(), &[40, 120]);
    }

    #[test]
    fn test_invalid_channels() {
        let image = Image::new(1, 1, 5, vec![0; 5]).unwrap();
        let mut runner = TaskRunner::new(GaussianBlurSeq::new(image));
        assert!(runner.validation().is_err());
    }

    #[test]
    fn test_distributed_matches_seq() {
        for (width, height, channels) in [(7, 9, 3), (5, 2, 1), (3, 1, 4)] {
            let image = pattern(width, height, channels);
            let expected = run_pipeline(GaussianBlurSeq::new(image.clone())).unwrap();
            for size in 1..=4 {
                let outputs = LocalUniverse::new(size)
                    .run(|comm| run_pipeline(GaussianBlurDistributed::new(comm, image.clone())))
                    .unwrap();
                for blurred in outputs {
                    assert_eq!(blurred, expected, "{width}x{height}x{channels} on {size} ranks");
                }
            }
        }
    }
}
