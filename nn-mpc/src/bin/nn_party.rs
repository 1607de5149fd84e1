use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use mpc_net::config::NetworkConfig;
use nn_mpc::prelude::{
    select_network, BatchConfig, Context, GroundTruth, NeuralNetwork, PartyKeys, Rep3Network,
    SecurityLevel, SharedInput, SharedWeights,
};
use plain_reference::ConfusionMatrix;
use tracing_subscriber::EnvFilter;

macro_rules! println0 {
    ($id:expr, $($arg:tt)*) => {
        if $id == 0 {
            println!($($arg)*);
        }
    };
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Opts {
    /// Id of this party (0, 1 or 2)
    #[arg(short, long, value_name = "ID", required = true)]
    party: usize,

    /// Network config yaml listing the three parties
    #[arg(short, long, value_name = "FILE", required = true)]
    config_file: PathBuf,

    /// Hex encoded private PRF key
    #[arg(long, value_name = "FILE", required = true)]
    key_private: PathBuf,

    /// Hex encoded PRF key shared with the next party
    #[arg(long, value_name = "FILE", required = true)]
    key_next: PathBuf,

    /// Hex encoded PRF key shared with the previous party
    #[arg(long, value_name = "FILE", required = true)]
    key_prev: PathBuf,

    /// Shared input batch written by create-sample-data
    #[arg(short, long, value_name = "FILE", required = true)]
    input: PathBuf,

    /// Shared weights written by create-sample-data, random weights if not set
    #[arg(short, long, value_name = "FILE")]
    weights: Option<PathBuf>,

    /// Plaintext labels; party 0 reports a confusion matrix against them
    #[arg(short, long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// SecureML, Sarda, MiniONN, LeNet (MNIST), AlexNet or VGG16 (CIFAR10, ImageNet)
    #[arg(short, long, default_value = "LeNet")]
    network: String,

    #[arg(short, long, default_value = "MNIST")]
    dataset: String,

    /// semi-honest or malicious
    #[arg(short, long, default_value = "semi-honest")]
    security: String,

    /// Training iterations on the input batch before predicting
    #[arg(long, default_value = "0")]
    iterations: usize,

    #[arg(long, default_value = "60")]
    timeout_secs: u64,
}

async fn run(opts: Opts) -> Result<()> {
    let security: SecurityLevel = opts.security.parse()?;
    let input = SharedInput::read_from_file(&opts.input)?;
    if input.party != opts.party {
        return Err(eyre!(
            "input file belongs to party {}, not party {}",
            input.party,
            opts.party
        ));
    }

    let config = select_network(&opts.network, &opts.dataset, input.rows, opts.iterations)?;
    if input.cols != config.input_size() {
        return Err(eyre!(
            "{} expects {} features per sample, input has {}",
            opts.network,
            config.input_size(),
            input.cols
        ));
    }
    let classes = config.output_size();
    if input.classes != classes {
        return Err(eyre!(
            "{} predicts {} classes, input is labelled with {}",
            opts.network,
            classes,
            input.classes
        ));
    }

    let keys = PartyKeys {
        private: PartyKeys::read_key_file(&opts.key_private)?,
        next: PartyKeys::read_key_file(&opts.key_next)?,
        prev: PartyKeys::read_key_file(&opts.key_prev)?,
    };

    let mut network_config = NetworkConfig::from_yaml_file(&opts.config_file, opts.party)?;
    network_config.timeout_secs = opts.timeout_secs;
    let network = Rep3Network::new(network_config).await?;
    let mut ctx = Context::new(network, &keys, security, BatchConfig::default()).await?;
    tracing::info!(
        "party {}: running {} on {} ({} samples, {})",
        opts.party,
        opts.network,
        opts.dataset,
        input.rows,
        security
    );

    let mut net = NeuralNetwork::new(config)?;
    match &opts.weights {
        Some(path) => {
            let weights = SharedWeights::read_from_file(path)?;
            if weights.party != opts.party {
                return Err(eyre!(
                    "weights file belongs to party {}, not party {}",
                    weights.party,
                    opts.party
                ));
            }
            net.load_shared_weights(weights)?;
        }
        None => net.initialize_weights(&mut ctx).await?,
    }

    println0!(opts.party, "----------------------------------------------");
    println0!(
        opts.party,
        "Run details: 3PC (P{}), {} iterations, batch size {}",
        opts.party,
        opts.iterations,
        input.rows
    );
    println0!(
        opts.party,
        "Running {} {} on {} dataset",
        security,
        opts.network,
        opts.dataset
    );
    println0!(opts.party, "----------------------------------------------");
    for (i, layer) in net.config().layers.iter().enumerate() {
        println0!(
            opts.party,
            "({}) {} {} -> {}",
            i + 1,
            layer.name(),
            layer.input_size(),
            layer.output_size()
        );
    }

    for i in 0..opts.iterations {
        net.train(&mut ctx, &input.shares, &input.labels).await?;
        tracing::info!("party {}: finished iteration {}", opts.party, i + 1);
    }

    let predicted = net.predict(&mut ctx, &input.shares).await?;
    if let (0, Some(path)) = (opts.party, &opts.labels) {
        let truth = GroundTruth::read_from_file(path)?;
        if truth.labels.len() != predicted.len() {
            return Err(eyre!(
                "{} labels for {} predictions",
                truth.labels.len(),
                predicted.len()
            ));
        }
        let matrix = ConfusionMatrix::from_labels(classes, &truth.labels, &predicted);
        println!("{}", matrix);
    }

    ctx.print_connection_stats(&mut std::io::stdout())?;
    ctx.finish().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    run(opts).await
}
