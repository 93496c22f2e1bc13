//! Command line tool for installing, configuring and querying the NFT minter
//! and the CEP-78 and CEP-18 contracts it works with.
//!
//! Write commands sign the deploy with the key given by `--key` and submit it,
//! or print it as JSON when `--dry-run` is given.
use anyhow::Context;
use nft_minting_sdk::{
    cep18::{Cep18Contract, Cep18InstallArgs},
    cep78::{Cep78Contract, Cep78InstallArgs, Cep78Variables, TokenIdentifier},
    contract_client::ContractClient,
    endpoints::{JsonRpcGateway, NodeGateway},
    minter::{
        ConfigUpdate, FreeMintArgs, InstallArgs, MinterContract, UpgradeArgs, WhitelistEntry,
    },
    types::{
        network::{Network, NetworkConfig},
        transactions::{ModuleBytes, SignedDeploy},
        DeploySigner, Identity, PublicKey, SecretKey, U256,
    },
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use structopt::{clap::AppSettings, StructOpt};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(StructOpt)]
struct App {
    #[structopt(
        long = "network",
        env = "NETWORK",
        help = "Network to use: casper-net-1, casper-test or casper."
    )]
    network:  Network,
    #[structopt(
        long = "config",
        help = "JSON file with the network configuration. Overrides the built-in defaults."
    )]
    config:   Option<PathBuf>,
    #[structopt(long = "key", help = "Path to the PEM file with the secret key of the sender.")]
    key_path: Option<PathBuf>,
    #[structopt(long = "dry-run", help = "Print signed deploys instead of submitting them.")]
    dry_run:  bool,
    #[structopt(subcommand)]
    contract: ContractCommand,
}

#[derive(StructOpt)]
enum ContractCommand {
    #[structopt(about = "Commands for the minter contract.")]
    Minter(MinterCommand),
    #[structopt(about = "Commands for the CEP-78 collection.")]
    Cep78(Cep78Command),
    #[structopt(about = "Commands for the CEP-18 token.")]
    Cep18(Cep18Command),
}

#[derive(StructOpt)]
enum MinterCommand {
    #[structopt(about = "Install the minter.")]
    Install {
        #[structopt(long, help = "Path to the contract wasm.")]
        wasm: PathBuf,
        #[structopt(long, help = "JSON file with the installation arguments.")]
        args: PathBuf,
    },
    #[structopt(about = "Install a new version of the minter.")]
    Upgrade {
        #[structopt(long, help = "Path to the contract wasm.")]
        wasm:        PathBuf,
        #[structopt(long, help = "Name the minter was installed with.")]
        name:        String,
        #[structopt(long, help = "Disable the previous version.")]
        disable_old: bool,
    },
    #[structopt(about = "Change the given configuration fields.")]
    SetConfig {
        #[structopt(long)]
        admin:          Option<Identity>,
        #[structopt(long)]
        fund_manager:   Option<Identity>,
        #[structopt(long, help = "Fee per token in motes.")]
        mint_fee:       Option<U256>,
        #[structopt(long)]
        only_whitelist: Option<bool>,
        #[structopt(long)]
        allow_mint:     Option<bool>,
        #[structopt(long)]
        max_mint:       Option<u64>,
    },
    #[structopt(about = "Mint without paying the fee. Admin only.")]
    FreeMint {
        #[structopt(long)]
        owner: Identity,
        #[structopt(long, default_value = "1")]
        count: u64,
    },
    #[structopt(about = "Mint, paying the current mint cost.")]
    NativeMint {
        #[structopt(long, help = "Path to the mint session wasm.")]
        wasm:  PathBuf,
        #[structopt(long, help = "Owner of the minted tokens. Defaults to the sender.")]
        owner: Option<Identity>,
        #[structopt(long, default_value = "1")]
        count: u64,
    },
    #[structopt(about = "Set the whitelist status of accounts.")]
    SetWhitelist {
        #[structopt(long, help = "Replace the whole whitelist.")]
        reset:   bool,
        #[structopt(help = "Entries of the form `account-hash-…[=true|false]`.")]
        entries: Vec<WhitelistArg>,
    },
    #[structopt(about = "Show the minter's configuration.")]
    Show,
    #[structopt(about = "Check whether an account is whitelisted.")]
    IsWhitelisted { account: Identity },
    #[structopt(about = "Show the cost of minting the given number of tokens.")]
    MintCost { count: u64 },
}

#[derive(StructOpt)]
enum Cep78Command {
    #[structopt(about = "Install a collection.")]
    Install {
        #[structopt(long, help = "Path to the contract wasm.")]
        wasm: PathBuf,
        #[structopt(long, help = "JSON file with the installation arguments.")]
        args: PathBuf,
    },
    #[structopt(about = "Update the collection's variables.")]
    SetVariables {
        #[structopt(long, help = "JSON file with the variables to update.")]
        variables: PathBuf,
    },
    #[structopt(about = "Show the collection's configuration.")]
    Show,
    #[structopt(about = "Check whether an account or contract may mint.")]
    IsWhitelisted { identity: Identity },
    #[structopt(about = "Show the number of tokens held by an owner.")]
    BalanceOf { owner: Identity },
    #[structopt(about = "Show the owner and metadata of a token.")]
    Token { index: u64 },
}

#[derive(StructOpt)]
enum Cep18Command {
    #[structopt(about = "Install a token.")]
    Install {
        #[structopt(long, help = "Path to the contract wasm.")]
        wasm: PathBuf,
        #[structopt(long, help = "JSON file with the installation arguments.")]
        args: PathBuf,
    },
    #[structopt(about = "Mint tokens. Installer only.")]
    Mint {
        #[structopt(long)]
        owner:  Identity,
        #[structopt(long)]
        amount: U256,
    },
    #[structopt(about = "Allow a spender to transfer the sender's tokens.")]
    Approve {
        #[structopt(long)]
        spender: Identity,
        #[structopt(long)]
        amount:  U256,
    },
    #[structopt(about = "Show the balance of an owner.")]
    BalanceOf { owner: Identity },
}

struct WhitelistArg(WhitelistEntry);

impl std::str::FromStr for WhitelistArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, value) = match s.split_once('=') {
            Some((account, value)) => (account, value.parse().context("Value must be a bool.")?),
            None => (s, true),
        };
        Ok(Self(WhitelistEntry {
            account: account.parse()?,
            value,
        }))
    }
}

/// Everything a write command needs besides the deploy itself.
struct Sender {
    key:     SecretKey,
    dry_run: bool,
}

impl Sender {
    fn public_key(&self) -> PublicKey { self.key.public_key() }

    fn keys(&self) -> &[SecretKey] { std::slice::from_ref(&self.key) }

    async fn send<G: NodeGateway>(
        &self,
        client: &ContractClient<G>,
        signed: SignedDeploy,
    ) -> anyhow::Result<()> {
        if self.dry_run {
            println!("{}", serde_json::to_string_pretty(&signed)?);
        } else {
            let hash = client.submit(&signed).await?;
            println!("Deploy {} submitted.", hash);
        }
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data = std::fs::read(path).with_context(|| format!("Could not read {}.", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("Could not parse {}.", path.display()))
}

fn read_wasm(path: &Path) -> anyhow::Result<ModuleBytes> {
    ModuleBytes::from_file(path).with_context(|| format!("Could not read wasm {}.", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(env_filter).with_writer(std::io::stderr).try_init();
}

fn load_config(app: &App) -> anyhow::Result<NetworkConfig> {
    if let Some(path) = &app.config {
        return NetworkConfig::from_file(path)
            .with_context(|| format!("Could not load configuration {}.", path.display()));
    }
    let api_key = match app.network.api_key_variable() {
        Some(variable) => Some(
            std::env::var(variable)
                .with_context(|| format!("{} must be set for {}.", variable, app.network))?,
        ),
        None => None,
    };
    Ok(NetworkConfig::for_network(app.network, api_key.as_deref())?)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let app = {
        let app = App::clap().global_setting(AppSettings::ColoredHelp);
        let matches = app.get_matches();
        App::from_clap(&matches)
    };
    init_tracing();

    let config = load_config(&app)?;
    tracing::debug!(network = %config.network, node = %config.node_address, "Using network.");
    let gateway = JsonRpcGateway::new(&config.node_address)?;
    let sender = || -> anyhow::Result<Sender> {
        let path = app
            .key_path
            .as_ref()
            .context("This command needs the sender's key, given with --key.")?;
        let key = SecretKey::from_pem_file(path)
            .with_context(|| format!("Could not load key {}.", path.display()))?;
        Ok(Sender {
            key,
            dry_run: app.dry_run,
        })
    };

    match &app.contract {
        ContractCommand::Minter(command) => {
            let minter = MinterContract::from_config(gateway, &config);
            run_minter(&minter, command, sender).await
        }
        ContractCommand::Cep78(command) => {
            let cep78 = Cep78Contract::from_config(gateway, &config);
            run_cep78(&cep78, command, sender).await
        }
        ContractCommand::Cep18(command) => {
            let cep18 = Cep18Contract::from_config(gateway, &config);
            run_cep18(&cep18, command, sender).await
        }
    }
}

async fn run_minter<G: NodeGateway>(
    minter: &MinterContract<G>,
    command: &MinterCommand,
    sender: impl FnOnce() -> anyhow::Result<Sender>,
) -> anyhow::Result<()> {
    let deploy_sender;
    let deploy = match command {
        MinterCommand::Show => return print_json(&minter.state().await?),
        MinterCommand::IsWhitelisted { account } => {
            println!("{}", minter.is_whitelisted(account).await?);
            return Ok(());
        }
        MinterCommand::MintCost { count } => {
            println!("{}", minter.mint_cost(*count).await?);
            return Ok(());
        }
        MinterCommand::Install { wasm, args } => {
            deploy_sender = sender()?;
            let args: InstallArgs = read_json(args)?;
            minter.install(read_wasm(wasm)?, &args, deploy_sender.keys())?
        }
        MinterCommand::Upgrade {
            wasm,
            name,
            disable_old,
        } => {
            deploy_sender = sender()?;
            let args = UpgradeArgs {
                name:        name.clone(),
                disable_old: *disable_old,
            };
            minter.upgrade(read_wasm(wasm)?, &args, deploy_sender.keys())?
        }
        MinterCommand::SetConfig {
            admin,
            fund_manager,
            mint_fee,
            only_whitelist,
            allow_mint,
            max_mint,
        } => {
            let update = ConfigUpdate {
                admin:          *admin,
                fund_manager:   *fund_manager,
                mint_fee:       mint_fee.clone(),
                only_whitelist: *only_whitelist,
                allow_mint:     *allow_mint,
                max_mint:       *max_mint,
            };
            anyhow::ensure!(!update.is_empty(), "No configuration field given.");
            deploy_sender = sender()?;
            minter.set_config(&update, deploy_sender.keys())?
        }
        MinterCommand::FreeMint { owner, count } => {
            deploy_sender = sender()?;
            let args = FreeMintArgs {
                nft_owner: *owner,
                count:     *count,
            };
            minter.free_mint(&args, deploy_sender.keys())?
        }
        MinterCommand::NativeMint { wasm, owner, count } => {
            deploy_sender = sender()?;
            let owner =
                owner.unwrap_or_else(|| Identity::from_public_key(&deploy_sender.public_key()));
            let args = minter.native_mint_args(owner, *count).await?;
            tracing::info!(amount = %args.amount, count, "Paying the mint cost.");
            minter.native_mint(read_wasm(wasm)?, &args, deploy_sender.keys())?
        }
        MinterCommand::SetWhitelist { reset, entries } => {
            deploy_sender = sender()?;
            let entries: Vec<WhitelistEntry> = entries.iter().map(|e| e.0).collect();
            if *reset {
                minter.reset_whitelist(&entries, deploy_sender.keys())?
            } else {
                minter.set_whitelist(&entries, deploy_sender.keys())?
            }
        }
    };
    deploy_sender.send(minter.client(), deploy).await
}

async fn run_cep78<G: NodeGateway>(
    cep78: &Cep78Contract<G>,
    command: &Cep78Command,
    sender: impl FnOnce() -> anyhow::Result<Sender>,
) -> anyhow::Result<()> {
    match command {
        Cep78Command::Install { wasm, args } => {
            let sender = sender()?;
            let args: Cep78InstallArgs = read_json(args)?;
            let deploy = cep78.install(read_wasm(wasm)?, &args, sender.keys())?;
            sender.send(cep78.client(), deploy).await
        }
        Cep78Command::SetVariables { variables } => {
            let sender = sender()?;
            let variables: Cep78Variables = read_json(variables)?;
            let deploy = cep78.set_variables(variables, sender.keys())?;
            sender.send(cep78.client(), deploy).await
        }
        Cep78Command::Show => print_json(&cep78.collection_info().await?),
        Cep78Command::IsWhitelisted { identity } => {
            println!("{}", cep78.is_contract_whitelisted(identity).await?);
            Ok(())
        }
        Cep78Command::BalanceOf { owner } => {
            println!("{}", cep78.balance_of(owner).await?);
            Ok(())
        }
        Cep78Command::Token { index } => {
            let token = TokenIdentifier::Index(*index);
            let (owner, metadata) =
                futures::try_join!(cep78.owner_of(&token), cep78.metadata_of(&token))?;
            print_json(&serde_json::json!({
                "token": token.to_string(),
                "owner": owner.found(),
                "metadata": metadata.found(),
            }))
        }
    }
}

async fn run_cep18<G: NodeGateway>(
    cep18: &Cep18Contract<G>,
    command: &Cep18Command,
    sender: impl FnOnce() -> anyhow::Result<Sender>,
) -> anyhow::Result<()> {
    let deploy_sender;
    let deploy = match command {
        Cep18Command::BalanceOf { owner } => {
            println!("{}", cep18.balance_of(owner).await?);
            return Ok(());
        }
        Cep18Command::Install { wasm, args } => {
            deploy_sender = sender()?;
            let args: Cep18InstallArgs = read_json(args)?;
            cep18.install(read_wasm(wasm)?, &args, deploy_sender.keys())?
        }
        Cep18Command::Mint { owner, amount } => {
            deploy_sender = sender()?;
            cep18.mint(owner, amount.clone(), deploy_sender.keys())?
        }
        Cep18Command::Approve { spender, amount } => {
            deploy_sender = sender()?;
            cep18.approve(spender, amount.clone(), deploy_sender.keys())?
        }
    };
    deploy_sender.send(cep18.client(), deploy).await
}
