use async_trait::async_trait;
use tracing::info;

use crate::element::ElementSource;
use crate::errors::Result;
use crate::types::Locator;

/// Pointer-gesture capabilities for any element wrapper. Each action
/// resolves the live element, then plays a single gesture through the
/// driver.
#[async_trait]
pub trait GestureActions: ElementSource {
    /// Drag this element onto another wrapper's element. The destination
    /// is resolved before the gesture plays.
    async fn drag_and_drop(&self, destination: &(dyn ElementSource)) -> Result<()> {
        info!(
            element = self.name(),
            destination = destination.name(),
            "drag and drop"
        );
        let source = self.resolve().await?;
        let target = destination.resolve().await?;
        source.drag_and_drop_to(target.locator()).await
    }

    /// Drag this element onto a bare locator.
    async fn drag_and_drop_to(&self, destination: &Locator) -> Result<()> {
        info!(element = self.name(), destination = %destination, "drag and drop");
        self.resolve().await?.drag_and_drop_to(destination).await
    }

    async fn double_click(&self) -> Result<()> {
        info!(element = self.name(), "double click");
        self.resolve().await?.double_click().await
    }

    async fn move_to(&self) -> Result<()> {
        info!(element = self.name(), "moving to element");
        self.resolve().await?.move_to().await
    }

    async fn move_to_and_click(&self) -> Result<()> {
        info!(element = self.name(), "moving to and clicking element");
        self.resolve().await?.move_to_and_click().await
    }
}

impl<T: ElementSource + ?Sized> GestureActions for T {}
