pub mod event;
pub mod purchase;
pub mod ticket;
pub mod user;
pub mod wallet;

pub use event::{CustomField, Event, EventType};
pub use purchase::{PaymentStatus, Purchase};
pub use ticket::{AttendeeInfo, SaleAvailability, Ticket, TicketStatus, TicketType};
pub use user::User;
pub use wallet::{WalletTransaction, WalletTransactionStatus, WalletTransactionType};
