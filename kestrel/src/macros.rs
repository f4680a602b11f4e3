/// Creates a single chat [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use kestrel::{Role, kmsg};
///
/// let message = kmsg!(assistant => "Done.");
/// assert_eq!(message.role, Role::Assistant);
/// assert_eq!(message.content.as_text(), Some("Done."));
/// ```
#[macro_export]
macro_rules! kmsg {
    (system => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::System, $content)
    };
    (user => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::User, $content)
    };
    (assistant => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::Assistant, $content)
    };
    ($role:ident => $content:expr $(,)?) => {
        compile_error!("unsupported role: use system, user, or assistant");
    };
}

/// Creates a `Vec<Message>` from role/content pairs.
///
/// ```rust
/// use kestrel::{Role, kmessages};
///
/// let messages = kmessages![
///     system => "You are concise.",
///     user => "Summarize this repository.",
/// ];
///
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[1].role, Role::User);
/// ```
#[macro_export]
macro_rules! kmessages {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident => $content:expr),+ $(,)?) => {
        vec![$($crate::kmsg!($role => $content)),+]
    };
}

/// Creates a [`ModelRequest`](crate::ModelRequest) from a model id and role/content pairs.
///
/// An empty model id defers to the provider's configured or default model.
///
/// ```rust
/// use kestrel::krequest;
///
/// let request = krequest!("amazon.nova-lite-v1:0"; user => "Hello");
/// assert_eq!(request.model, "amazon.nova-lite-v1:0");
/// assert_eq!(request.messages.len(), 1);
/// ```
#[macro_export]
macro_rules! krequest {
    ($model:expr; $($role:ident => $content:expr),+ $(,)?) => {
        $crate::ModelRequest::new($model, $crate::kmessages![$($role => $content),+])
    };
}
