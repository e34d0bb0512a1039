use anyhow::{anyhow, Result};

crate::service! {
    service echo_svc {
        fn echo(msg: String) -> String;
        fn fail() -> ();
    }
}

pub struct Echo;

#[async_trait::async_trait]
impl echo_svc::Service for Echo {
    async fn echo(&mut self, msg: String) -> Result<String> {
        Ok(msg)
    }
    async fn fail(&mut self) -> Result<()> {
        Err(anyhow!("refusing on purpose"))
    }
}
