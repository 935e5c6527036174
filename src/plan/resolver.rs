// 参数解析：把 1-2 个位置参数解析为传输计划
use crate::config::ServiceDestinations;
use crate::plan::connection::resolve_endpoint;
use crate::plan::reference::validate_image_name;
use crate::plan::{Direction, TransferPlan};
use crate::utils::error::TransferError;
use anyhow::Result;

/// One positional token of the scp grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// `IMAGE`
    Bare(&'a str),
    /// `HOST::` or `HOST::IMAGE`
    Host { host: &'a str, image: Option<&'a str> },
    /// `USER@localhost::IMAGE`
    User { user: &'a str, image: Option<&'a str> },
}

impl<'a> Token<'a> {
    fn classify(raw: &'a str) -> Self {
        let image = raw
            .split_once("::")
            .map(|(_, image)| image)
            .filter(|image| !image.is_empty());

        if raw.contains("@localhost") {
            let user = raw.split('@').next().unwrap_or_default();
            Token::User { user, image }
        } else if let Some((host, _)) = raw.split_once("::") {
            Token::Host { host, image }
        } else {
            Token::Bare(raw)
        }
    }

    fn image(self) -> Option<&'a str> {
        match self {
            Token::Bare(image) => Some(image),
            Token::Host { image, .. } | Token::User { image, .. } => image,
        }
    }
}

/// What the grammar decided, before any connection is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Decision<'a> {
    direction: Direction,
    image: &'a str,
    target_user: Option<&'a str>,
    connections: Vec<&'a str>,
}

impl<'a> Decision<'a> {
    fn new(direction: Direction, image: &'a str, connections: Vec<&'a str>) -> Self {
        Decision { direction, image, target_user: None, connections }
    }

    fn user(user: &'a str, image: &'a str) -> Self {
        Decision {
            direction: Direction::UserTransfer,
            image,
            target_user: Some(user).filter(|user| !user.is_empty()),
            connections: Vec::new(),
        }
    }
}

fn decide<'a>(args: &'a [String]) -> Result<Decision<'a>, TransferError> {
    let tokens: Vec<Token<'a>> = args.iter().map(|arg| Token::classify(arg)).collect();

    match *tokens.as_slice() {
        [Token::User { user, image }] => Ok(Decision::user(user, image.ok_or(TransferError::NoImage)?)),
        [Token::Host { host, image }] => Ok(Decision::new(
            Direction::PullFromRemote,
            image.ok_or(TransferError::NoImage)?,
            vec![host],
        )),
        [Token::Bare(image)] => Ok(Decision::new(Direction::Local, image, Vec::new())),
        [first, second] => decide_pair(first, second),
        _ => Err(TransferError::InvalidArgument(format!(
            "accepts between 1 and 2 arg(s), received {}",
            args.len()
        ))),
    }
}

fn decide_pair<'a>(first: Token<'a>, second: Token<'a>) -> Result<Decision<'a>, TransferError> {
    use Token::{Bare, Host, User};

    let rename = || TransferError::InvalidArgument("cannot specify an image rename".to_string());

    match (first, second) {
        (User { .. }, _) | (_, User { .. }) => [first, second]
            .into_iter()
            .find_map(|token| match token {
                User { user, image: Some(image) } => Some(Decision::user(user, image)),
                _ => None,
            })
            .ok_or(TransferError::NoImage),

        (Host { host, image: None }, Bare(image)) | (Bare(image), Host { host, image: None }) => {
            Ok(Decision::new(Direction::PushToRemote, image, vec![host]))
        }
        (Host { image: Some(_), .. }, Bare(_)) | (Bare(_), Host { image: Some(_), .. }) => Err(rename()),

        // 第一个参数没有镜像名：它是拉取源
        (Host { host: pull, image: None }, Host { host: push, image }) => Ok(Decision::new(
            Direction::RemoteToRemote,
            image.ok_or(TransferError::NoImage)?,
            vec![pull, push],
        )),
        (Host { image: Some(_), .. }, Host { image: Some(_), .. }) => Err(rename()),
        // 参数顺序相反：第二个参数是拉取源
        (Host { host: push, image: Some(image) }, Host { host: pull, image: None }) => {
            Ok(Decision::new(Direction::RemoteToRemote, image, vec![pull, push]))
        }

        (Bare(_), Bare(_)) => Err(rename()),
    }
}

/// Turns the positional arguments into an immutable [`TransferPlan`].
///
/// All image names are validated and every connection alias is resolved
/// before anything touches the network or spawns a process.
pub fn resolve_args(args: &[String], destinations: &ServiceDestinations, default_user: &str) -> Result<TransferPlan> {
    let decision = decide(args)?;
    // 用户传输会忽略另一个参数，但其中的镜像名同样要合法
    for image in args.iter().filter_map(|arg| Token::classify(arg).image()) {
        validate_image_name(image)?;
    }

    let endpoints = decision
        .connections
        .iter()
        .map(|alias| resolve_endpoint(alias, destinations, default_user))
        .collect::<Result<Vec<_>>>()?;

    Ok(TransferPlan {
        direction: decision.direction,
        source_image: decision.image.to_string(),
        target_user: decision.target_user.map(str::to_string),
        connections: decision.connections.into_iter().map(str::to_string).collect(),
        endpoints,
    })
}
