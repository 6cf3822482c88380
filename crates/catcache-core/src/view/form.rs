use crate::cache::{CategoryStore, StoreError};
use crate::models::{Category, CategoryInput, CategoryStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormMode {
    #[default]
    Add,
    Edit {
        id: i64,
    },
}

/// Add/edit form state. Submitting dispatches a create or an update
/// through the store and returns the form to add mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryForm {
    pub name: String,
    pub status: CategoryStatus,
    mode: FormMode,
}

impl CategoryForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit { .. })
    }

    /// Preload the form from an existing record.
    pub fn begin_edit(&mut self, category: &Category) {
        self.mode = FormMode::Edit { id: category.id };
        self.name = category.name.clone();
        self.status = category.effective_status();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Validate and submit. An empty name keeps the form as it is; any
    /// other outcome resets it.
    pub async fn submit(
        &mut self,
        store: &CategoryStore,
    ) -> Result<Option<Category>, StoreError> {
        let input = CategoryInput::new(&self.name, Some(self.status))?;
        let result = match self.mode {
            FormMode::Add => store.create(&input).await,
            FormMode::Edit { id } => store.update(id, &input).await,
        };
        self.reset();
        result
    }
}
