//! Shared application state handed to every handler.

use parley_crypto::CredentialHasher;

use crate::accounts::AccountService;
use crate::auth::{JwtManager, TokenAuthority};
use crate::chat::MessageStore;
use crate::realtime::Dispatcher;
use crate::registry::ConnectionRegistry;
use crate::storage::ChatDatabase;

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub tokens: TokenAuthority,
    pub messages: MessageStore,
    pub dispatcher: Dispatcher,
    /// Also keys `/encrypt` and `/decrypt`.
    pub hasher: CredentialHasher,
}

impl AppState {
    pub fn new(db: ChatDatabase, jwt: JwtManager, hasher: CredentialHasher, salt_len: usize) -> Self {
        let tokens = TokenAuthority::new(jwt, db.clone());
        let messages = MessageStore::new(db.clone());
        let accounts = AccountService::new(db, hasher.clone(), tokens.clone(), salt_len);
        let dispatcher = Dispatcher::new(ConnectionRegistry::new(), messages.clone());

        Self {
            accounts,
            tokens,
            messages,
            dispatcher,
            hasher,
        }
    }
}
