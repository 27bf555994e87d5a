/// Session context
///
/// Explicit session object passed to the stores that need the viewer's
/// identity. Holds the authenticated session and the viewer's own profile;
/// auth-state changes are observable through a watch channel.
use crate::{
    backend::{decode_rows, DataPlane, Filter, Query, Session, SignUpRequest, Table},
    error::{ClientError, ClientResult},
    models::Profile,
    toast::ToastSink,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use uuid::Uuid;
use validator::ValidateEmail;

#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    profile: Option<Profile>,
}

/// Viewer session and profile state
#[derive(Clone)]
pub struct SessionContext {
    data: Arc<dyn DataPlane>,
    toasts: ToastSink,
    state: Arc<RwLock<SessionState>>,
    auth_tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionContext {
    pub fn new(data: Arc<dyn DataPlane>, toasts: ToastSink) -> Self {
        let (auth_tx, _) = watch::channel(None);
        Self {
            data,
            toasts,
            state: Arc::new(RwLock::new(SessionState::default())),
            auth_tx: Arc::new(auth_tx),
        }
    }

    /// Current session, if signed in
    pub fn session(&self) -> Option<Session> {
        self.state.read().session.clone()
    }

    /// Current viewer id, if signed in
    pub fn user_id(&self) -> Option<Uuid> {
        self.state.read().session.as_ref().map(|s| s.user_id)
    }

    /// Viewer id, or an authentication error for mutators that require one
    pub fn require_user(&self) -> ClientResult<Uuid> {
        self.user_id()
            .ok_or_else(|| ClientError::Authentication("Not signed in".to_string()))
    }

    /// The viewer's own profile, refreshed after sign-in and on demand
    pub fn profile(&self) -> Option<Profile> {
        self.state.read().profile.clone()
    }

    /// Observe auth-state changes (sign-in and sign-out)
    pub fn watch_auth(&self) -> watch::Receiver<Option<Session>> {
        self.auth_tx.subscribe()
    }

    fn validate_credentials(email: &str, password: &str) -> ClientResult<()> {
        if !email.validate_email() {
            return Err(ClientError::Validation(
                "กรุณากรอกอีเมลที่ถูกต้อง".to_string(),
            ));
        }
        if password.chars().count() < 6 {
            return Err(ClientError::Validation(
                "รหัสผ่านต้องมีอย่างน้อย 6 ตัวอักษร".to_string(),
            ));
        }
        Ok(())
    }

    /// Register a new account and start a session
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> ClientResult<()> {
        Self::validate_credentials(email, password)?;
        if display_name.chars().count() < 2 {
            return Err(ClientError::Validation(
                "ชื่อที่แสดงต้องมีอย่างน้อย 2 ตัวอักษร".to_string(),
            ));
        }

        let request = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            display_name: display_name.to_string(),
        };
        match self.data.sign_up(request).await {
            Ok(session) => {
                info!(user_id = %session.user_id, "Signed up");
                self.install_session(session).await;
                self.toasts.success("สมัครสมาชิกสำเร็จ! 🎉");
                Ok(())
            }
            Err(ClientError::Conflict(message)) => {
                self.toasts.error("อีเมลนี้ถูกใช้งานแล้ว");
                Err(ClientError::Conflict(message))
            }
            Err(e) => {
                error!("Sign-up failed: {}", e);
                self.toasts.error(e.user_message());
                Err(e)
            }
        }
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<()> {
        Self::validate_credentials(email, password)?;

        match self.data.sign_in(email, password).await {
            Ok(session) => {
                info!(user_id = %session.user_id, "Signed in");
                self.install_session(session).await;
                self.toasts.success("เข้าสู่ระบบสำเร็จ");
                Ok(())
            }
            Err(e) => {
                error!("Sign-in failed: {}", e);
                self.toasts.error("อีเมลหรือรหัสผ่านไม่ถูกต้อง");
                Err(e)
            }
        }
    }

    /// End the current session
    pub async fn sign_out(&self) -> ClientResult<()> {
        let token = match self.session() {
            Some(session) => session.access_token,
            None => return Ok(()),
        };
        self.data.sign_out(&token).await?;
        {
            let mut state = self.state.write();
            state.session = None;
            state.profile = None;
        }
        let _ = self.auth_tx.send(None);
        Ok(())
    }

    async fn install_session(&self, session: Session) {
        {
            let mut state = self.state.write();
            state.session = Some(session.clone());
        }
        let _ = self.auth_tx.send(Some(session));
        if let Err(e) = self.refresh_profile().await {
            error!("Failed to load profile after sign-in: {}", e);
        }
    }

    /// Re-fetch the viewer's profile row
    pub async fn refresh_profile(&self) -> ClientResult<()> {
        let user_id = self.require_user()?;
        let rows = self
            .data
            .select(
                Table::Profiles,
                Query::new().filter(Filter::eq("user_id", user_id)).limit(1),
            )
            .await?;
        let mut profiles: Vec<Profile> = decode_rows(rows)?;
        self.state.write().profile = profiles.pop();
        Ok(())
    }
}
