use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{eyre, Context, Result};
use mpc_net::config::NetworkParty;
use nn_mpc::prelude::{select_network, GroundTruth, PartyKeys, SharedInput, SharedWeights};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Opts {
    /// Directory for the key, share and network files
    #[arg(short, long, value_name = "DIR", required = true)]
    out_dir: PathBuf,

    /// Number of samples
    #[arg(short, long, default_value = "128")]
    batch: usize,

    /// Features per sample, taken from the model if one is given
    #[arg(short, long, default_value = "784")]
    features: usize,

    /// Number of classes, taken from the model if one is given
    #[arg(short, long, default_value = "10")]
    classes: usize,

    /// Also deal weights of this network (SecureML, Sarda, MiniONN, LeNet, AlexNet or VGG16)
    #[arg(short, long)]
    model: Option<String>,

    #[arg(short, long, default_value = "MNIST")]
    dataset: String,

    /// Seed of the dealer, random if not set
    #[arg(short, long)]
    seed: Option<u64>,

    /// Also write network.yaml for three parties on localhost
    #[arg(long, default_value = "false")]
    network: bool,
}

fn write_file(path: PathBuf, content: impl AsRef<[u8]>) -> Result<()> {
    std::fs::write(&path, content).with_context(|| format!("while writing {}", path.display()))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let mut opts = Opts::parse();
    let model = match opts.model.as_deref() {
        Some(network) => {
            let config = select_network(network, &opts.dataset, opts.batch, 1)?;
            opts.features = config.input_size();
            opts.classes = config.output_size();
            Some((network.to_owned(), config))
        }
        None => None,
    };
    if opts.batch == 0 || opts.features == 0 || opts.classes == 0 {
        return Err(eyre!("batch, features and classes must be positive"));
    }
    std::fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("while creating {}", opts.out_dir.display()))?;

    let mut rng = match opts.seed {
        Some(seed) => ChaCha12Rng::seed_from_u64(seed),
        None => ChaCha12Rng::from_entropy(),
    };

    let keys = PartyKeys::generate_all(&mut rng);
    for (i, key) in keys.iter().enumerate() {
        for (name, seed) in [
            ("private", &key.private),
            ("next", &key.next),
            ("prev", &key.prev),
        ] {
            let path = opts.out_dir.join(format!("keyP{}_{}", i, name));
            write_file(path, PartyKeys::to_hex(seed))?;
        }
    }

    // pixel intensities in [0, 1)
    let values: Vec<f64> = (0..opts.batch * opts.features)
        .map(|_| rng.gen::<f64>())
        .collect();
    let labels: Vec<usize> = (0..opts.batch)
        .map(|_| rng.gen_range(0..opts.classes))
        .collect();
    let inputs = SharedInput::deal(&values, &labels, opts.features, opts.classes, &mut rng)?;
    for input in inputs.iter() {
        input.write_to_file(opts.out_dir.join(format!("party{}.shares", input.party)))?;
    }
    GroundTruth { labels }.write_to_file(opts.out_dir.join("labels.bin"))?;

    if let Some((network, config)) = model {
        let models = SharedWeights::deal(&config, &network, &opts.dataset, &mut rng)?;
        for model in models.iter() {
            model.write_to_file(opts.out_dir.join(format!("party{}.weights", model.party)))?;
        }
        println!("Wrote shared {} weights for {}", network, opts.dataset);
    }

    if opts.network {
        let parties = (0..3)
            .map(|id| {
                Ok(NetworkParty {
                    id,
                    socket_addr: format!("127.0.0.1:{}", 10000 + id).parse()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let yaml = serde_yaml::to_string(&parties)?;
        write_file(opts.out_dir.join("network.yaml"), yaml)?;
    }

    println!(
        "Wrote keys and shares of {} samples for 3 parties to {}",
        opts.batch,
        opts.out_dir.display()
    );
    Ok(())
}
