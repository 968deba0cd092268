use crate::domain::entities::{Command, CommandRegistry, Message, Content};
use crate::application::errors::CommandError;

/// Service for managing and executing commands
pub struct CommandService {
    registry: CommandRegistry,
    prefix: String,
    allowed_users: Option<Vec<String>>,
}

impl CommandService {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            registry: CommandRegistry::new(),
            prefix: prefix.into(),
            allowed_users: None,
        }
    }

    /// Restrict commands to these sender ids. Messages without a sender are local and always allowed.
    pub fn with_allowed_users(mut self, users: Vec<String>) -> Self {
        self.allowed_users = Some(users);
        self
    }

    pub fn register(&mut self, command: Command) {
        self.registry.register(command);
    }

    pub fn register_defaults(&mut self) {
        // Version command
        self.register(Command::new("version")
            .with_description("Show bot version")
            .with_handler(|_| async {
                Ok(format!("modkeeper v{}", env!("CARGO_PKG_VERSION")))
            }));
    }

    fn is_allowed(&self, message: &Message) -> bool {
        match (&self.allowed_users, message.sender_id()) {
            (Some(users), Some(id)) => users.iter().any(|u| u == id),
            _ => true,
        }
    }

    pub async fn handle(&self, message: &Message) -> Result<Option<String>, CommandError> {
        let Content::Command { name, args } = &message.content else {
            return Ok(None);
        };

        if !self.is_allowed(message) {
            tracing::warn!("Rejected /{} from {:?}", name, message.sender_id());
            return Err(CommandError::PermissionDenied);
        }

        if name.eq_ignore_ascii_case("help") {
            return Ok(Some(self.get_help(args.first().map(String::as_str))));
        }

        // Find command (without prefix)
        let cmd = self.registry.find(name)
            .ok_or_else(|| CommandError::NotFound(name.clone()))?;

        // Execute handler
        if let Some(handler) = &cmd.handler {
            Ok(Some(handler(message.clone()).await?))
        } else {
            Ok(Some(format!("Command {} not implemented", cmd.name)))
        }
    }

    pub fn get_help(&self, command: Option<&str>) -> String {
        if let Some(name) = command {
            if let Some(cmd) = self.registry.find(name) {
                let mut help = format!("{}{} - {}", self.prefix, cmd.name, cmd.description.as_deref().unwrap_or("No description"));
                if !cmd.aliases.is_empty() {
                    help.push_str(&format!("\nAliases: {}", cmd.aliases.join(", ")));
                }
                if let Some(usage) = &cmd.usage {
                    help.push_str(&format!("\nUsage: {}", usage));
                }
                return help;
            }
            return format!("Command {}{} not found", self.prefix, name);
        }

        // List all commands
        let mut help = "Available commands:\n".to_string();
        for cmd in self.registry.all() {
            help.push_str(&format!("  {}{} - {}\n", self.prefix, cmd.name, cmd.description.as_deref().unwrap_or("")));
        }
        help
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
