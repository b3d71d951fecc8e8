pub mod dispatcher;
pub mod mailer;
pub mod processor;
pub mod smtp;
pub mod worker;

pub use dispatcher::{Dispatcher, PoolHandle};
pub use mailer::{Mailer, SubmitError, mail_queue};
pub use processor::MailProcessor;
pub use smtp::{DeliveryError, MailTransport, OutboundMail, SmtpMailer};
pub use worker::{Worker, WorkerHandle};
