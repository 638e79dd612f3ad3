//! Credential upgrade around a [`RemoteApi`].
//!
//! Calls start with whatever credentials the local store remembers. A
//! `Forbidden` answer while anonymous triggers an interactive login (at most
//! [`LOGIN_RETRIES`] prompts) after which the call is replayed once; an
//! expired token is dropped and the call retried once without it. A
//! `Forbidden` answer for an authenticated user is final: retrying could
//! silently switch identities.

use std::rc::Rc;

use tracing::debug;

use bk_domain::Credentials;
use bk_store::{LocalDb, StoreError};

use crate::api::{Call, RemoteApi, Reply, Session};
use crate::error::{ApiError, ErrorKind};
use crate::fingerprint::machine_fingerprint;
use crate::io::UserIo;

pub const LOGIN_RETRIES: usize = 3;

const LOGIN_HINT: &str = "Please log in to perform this action. \
     If you don't have an account, sign up at the registry website";

/// Where remembered credentials live.
pub trait LoginStore {
    fn get_login(&self) -> Result<Credentials, StoreError>;
    fn set_login(&self, login: &Credentials) -> Result<(), StoreError>;
}

impl LoginStore for LocalDb {
    fn get_login(&self) -> Result<Credentials, StoreError> {
        LocalDb::get_login(self)
    }

    fn set_login(&self, login: &Credentials) -> Result<(), StoreError> {
        LocalDb::set_login(self, login)
    }
}

impl<T: LoginStore + ?Sized> LoginStore for Rc<T> {
    fn get_login(&self) -> Result<Credentials, StoreError> {
        (**self).get_login()
    }

    fn set_login(&self, login: &Credentials) -> Result<(), StoreError> {
        (**self).set_login(login)
    }
}

/// Wraps a transport with the login/retry state machine.
pub struct AuthManager<R, S> {
    remote: R,
    store: S,
    io: Rc<dyn UserIo>,
    user: Option<String>,
    fingerprint: String,
}

impl<R, S> AuthManager<R, S>
where
    R: RemoteApi + Session,
    S: LoginStore,
{
    /// Loads the remembered user and token into `remote`.
    pub fn new(mut remote: R, store: S, io: Rc<dyn UserIo>) -> Result<Self, ApiError> {
        let login = store.get_login()?;
        remote.set_token(login.token);
        Ok(Self {
            remote,
            store,
            io,
            user: login.username,
            fingerprint: machine_fingerprint(),
        })
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    #[must_use]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    fn is_anonymous(&self) -> bool {
        self.user.is_none() || self.remote.token().is_none()
    }

    fn refresh_identity(&mut self) {
        self.remote
            .set_identity(&self.fingerprint, self.user.as_deref());
    }

    fn store_login(&self, login: &Credentials) {
        if let Err(err) = self.store.set_login(login) {
            self.io
                .error("Your credentials could not be stored in local cache");
            debug!(error = %err, "failed to persist credentials");
        }
    }

    fn call_with_recovery(
        &mut self,
        call: &Call<'_>,
        token_reset_left: bool,
    ) -> Result<Reply, ApiError> {
        self.refresh_identity();
        match self.remote.invoke(call) {
            Err(err) if err.is(ErrorKind::Forbidden) => {
                if self.is_anonymous() {
                    debug!(
                        operation = %call.operation(),
                        "anonymous call forbidden, asking for login"
                    );
                    self.io.info(LOGIN_HINT);
                    self.retry_with_new_token(call)
                } else {
                    Err(err)
                }
            }
            Err(err) if err.is(ErrorKind::Authentication) && token_reset_left => {
                debug!(operation = %call.operation(), "token rejected, retrying without it");
                self.store_login(&Credentials {
                    username: self.user.clone(),
                    token: None,
                });
                self.remote.set_token(None);
                self.call_with_recovery(call, false)
            }
            other => other,
        }
    }

    fn retry_with_new_token(&mut self, call: &Call<'_>) -> Result<Reply, ApiError> {
        for attempt in 1..=LOGIN_RETRIES {
            let (user, password) = self
                .io
                .request_login(self.user.as_deref())
                .map_err(|err| {
                    ApiError::new(
                        ErrorKind::Authentication,
                        format!("could not read credentials: {err}"),
                    )
                })?;
            match self.remote.invoke(&Call::Authenticate {
                user: &user,
                password: &password,
            }) {
                Ok(Reply::Token(token)) => {
                    debug!(attempt, "login succeeded");
                    self.remote.set_token(Some(token.clone()));
                    self.store_login(&Credentials::new(user.as_str(), Some(token)));
                    self.user = Some(user);
                    self.refresh_identity();
                    return self.remote.invoke(call);
                }
                Ok(other) => {
                    return Err(ApiError::unexpected_reply(
                        crate::api::Operation::Authenticate,
                        &other,
                    ))
                }
                Err(err) if err.is(ErrorKind::Authentication) => match &self.user {
                    None => self.io.error("Wrong user or password"),
                    Some(known) => {
                        self.io
                            .error(&format!("Wrong password for user \"{known}\""));
                        self.io
                            .info("You can change username with \"bk user <username>\"");
                    }
                },
                Err(err) => return Err(err),
            }
        }
        Err(ApiError::new(
            ErrorKind::Authentication,
            "Too many failed login attempts",
        ))
    }
}

impl<R, S> RemoteApi for AuthManager<R, S>
where
    R: RemoteApi + Session,
    S: LoginStore,
{
    fn invoke(&mut self, call: &Call<'_>) -> Result<Reply, ApiError> {
        if let Call::Authenticate { .. } = call {
            return self.remote.invoke(call);
        }
        self.call_with_recovery(call, true)
    }
}
