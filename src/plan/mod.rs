// 传输计划
pub mod connection;
pub mod reference;
pub mod resolver;

pub use connection::Endpoint;
pub use resolver::resolve_args;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Save and load on this host as the current user.
    Local,
    PushToRemote,
    PullFromRemote,
    RemoteToRemote,
    /// Move an image between two accounts on this host.
    UserTransfer,
}

/// The resolved intent of one invocation.
///
/// `connections` and `endpoints` are parallel. For `RemoteToRemote` the first
/// entry is always the pull source and the second the push destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub direction: Direction,
    pub source_image: String,
    pub target_user: Option<String>,
    pub connections: Vec<String>,
    pub endpoints: Vec<Endpoint>,
}

impl TransferPlan {
    pub fn pull_source(&self) -> Option<&Endpoint> {
        match self.direction {
            Direction::PullFromRemote | Direction::RemoteToRemote => self.endpoints.first(),
            _ => None,
        }
    }

    pub fn push_destination(&self) -> Option<&Endpoint> {
        match self.direction {
            Direction::PushToRemote => self.endpoints.first(),
            Direction::RemoteToRemote => self.endpoints.get(1),
            _ => None,
        }
    }
}
