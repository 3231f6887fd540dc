mod login;
pub use login::{Login, Register};

mod circles;
pub use circles::{CircleChat, Circles};

mod messages;
pub use messages::DirectMessages;

mod friends;
pub use friends::Friends;
