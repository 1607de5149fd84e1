use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use plain_reference::{
    layers::{self, ConvShape},
    ConfusionMatrix,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Opts {
    /// Number of samples
    #[arg(short, long, default_value = "128")]
    batch: usize,

    /// Number of classes
    #[arg(short, long, default_value = "10")]
    classes: usize,

    /// Seed for the sample data and weights, random if not set
    #[arg(short, long)]
    seed: Option<u64>,
}

fn uniform<R: Rng>(rng: &mut R, len: usize, bound: f64) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(-bound..bound)).collect()
}

// Plaintext run of a small conv net on random 28x28 images; prints the metrics
// against random labels, which is the baseline the secure run should match.
fn main() -> Result<()> {
    color_eyre::install()?;
    let opts: Opts = Opts::parse();
    if opts.batch == 0 || opts.classes == 0 {
        return Err(eyre!("batch and classes must be positive"));
    }

    let mut rng = match opts.seed {
        Some(seed) => ChaCha12Rng::seed_from_u64(seed),
        None => ChaCha12Rng::from_entropy(),
    };

    let shape = ConvShape {
        height: 28,
        width: 28,
        channels: 1,
        filter_size: 5,
        filters: 4,
        stride: 1,
        padding: 0,
    };
    let (oh, ow) = shape.output_hw();
    let (ph, pw) = ((oh - 2) / 2 + 1, (ow - 2) / 2 + 1);
    let hidden = shape.filters * ph * pw;

    let input: Vec<f64> = (0..opts.batch * 28 * 28).map(|_| rng.gen::<f64>()).collect();
    let labels: Vec<usize> = (0..opts.batch).map(|_| rng.gen_range(0..opts.classes)).collect();

    let conv_w = uniform(&mut rng, 25 * shape.filters, 0.2);
    let conv_b = vec![0.0; shape.filters];
    let fc_w = uniform(&mut rng, hidden * opts.classes, 1.0 / (hidden as f64).sqrt());
    let fc_b = vec![0.0; opts.classes];

    let x = layers::convolution(&input, &conv_w, &conv_b, opts.batch, shape);
    let x = layers::relu(&x);
    let x = layers::maxpool(&x, opts.batch, shape.filters, oh, ow, 2, 2);
    let x = layers::fully_connected(&x, &fc_w, &fc_b, opts.batch, hidden, opts.classes);
    let predicted = layers::argmax(&x, opts.classes);

    let matrix = ConfusionMatrix::from_labels(opts.classes, &labels, &predicted);
    println!("{}", matrix);
    Ok(())
}
