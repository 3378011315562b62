//! `panelwire encode` / `panelwire send`: build (and deliver) one message.

use anyhow::{Context, bail};
use panelwire_client::Client;
use panelwire_config::ClientConfig;
use panelwire_core::{Message, Value, wire};

#[derive(clap::Args, Debug)]
pub struct MessageArgs {
    /// Project token
    #[arg(long, env = "PANELWIRE_TOKEN")]
    pub token: String,

    /// Event name; without it a profile `$set` is built instead
    #[arg(long)]
    pub event: Option<String>,

    /// Distinct id of the user (required for profile updates)
    #[arg(long)]
    pub distinct_id: Option<String>,

    /// Properties as a JSON object
    #[arg(long)]
    pub props: Option<String>,
}

fn parse_props(props: Option<&str>) -> anyhow::Result<Value> {
    let Some(raw) = props else {
        return Ok(Value::Null);
    };
    let json: serde_json::Value = serde_json::from_str(raw).context("--props is not valid JSON")?;
    if !json.is_object() {
        bail!("--props must be a JSON object");
    }
    Ok(json.into())
}

fn build(client: &Client, args: &MessageArgs) -> anyhow::Result<Message> {
    let properties = parse_props(args.props.as_deref())?;
    let distinct_id = args.distinct_id.clone().map(Value::from);

    let message = match &args.event {
        Some(event) => client.track_message(event, distinct_id.as_ref(), &properties)?,
        None => {
            let Some(distinct_id) = distinct_id else {
                bail!("--distinct-id is required when no --event is given");
            };
            client.people_set_message(&distinct_id, &properties)?
        }
    };
    Ok(message)
}

fn client(args: &MessageArgs) -> anyhow::Result<Client> {
    let config = ClientConfig::load().context("Failed to load config")?;
    Ok(Client::new(args.token.clone(), config)?)
}

pub fn encode(args: MessageArgs) -> anyhow::Result<()> {
    let client = client(&args)?;
    let message = build(&client, &args)?;

    println!("{}", serde_json::to_string_pretty(&message.data)?);
    println!("{}", wire::encode_message(&message)?);
    Ok(())
}

pub async fn send(args: MessageArgs) -> anyhow::Result<()> {
    let client = client(&args)?;
    let message = build(&client, &args)?;

    let cancel = client.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    tracing::debug!(kind = %message.kind, "Sending message");
    if !client.send(&message).await? {
        bail!("{} message was not accepted", message.kind);
    }
    println!("✅ {} message accepted", message.kind);
    Ok(())
}
