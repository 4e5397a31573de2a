//! An in-memory `PageDriver` used by this crate's own test suite (and
//! available to downstream integration tests) so the stack can be
//! exercised without a real browser. `bsrv-cli` also wires this in as a
//! bundled reference driver until a production deployment supplies a
//! real `PageDriver` backed by a browser process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bsrv_protocol::WaitCondition;
use tokio::time::Instant;

use crate::driver::{
    BoundingBox, Browser, ClickOptions, Context, DriverError, ElementState, LaunchArgs, Locator,
    NavigateOutcome, Page, PageDriver,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryElement {
    pub tag: String,
    pub class: String,
    pub text: String,
    pub html: String,
    pub attributes: HashMap<String, String>,
    pub properties: HashMap<String, serde_json::Value>,
    pub visible: bool,
    pub bounding_box: Option<BoundingBox>,
    pub value: String,
}

#[derive(Debug, Default)]
struct PageState {
    current_url: String,
    title: String,
    extra_headers: HashMap<String, String>,
    elements: HashMap<String, Vec<MemoryElement>>,
    navigate_map: HashMap<String, (String, String)>,
    function_results: HashMap<String, bool>,
}

#[derive(Clone, Default)]
pub struct MemoryDriver {
    launch_count: Arc<Mutex<u32>>,
    last_page: Arc<Mutex<Option<MemoryPage>>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launch_count(&self) -> u32 {
        *self.launch_count.lock().unwrap()
    }

    /// The most recently created page, for tests that need to seed driver
    /// state on a session created through a `BrowserManager`.
    pub fn last_page(&self) -> Option<MemoryPage> {
        self.last_page.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageDriver for MemoryDriver {
    async fn launch(&self, _args: LaunchArgs) -> Result<Box<dyn Browser>, DriverError> {
        *self.launch_count.lock().unwrap() += 1;
        Ok(Box::new(MemoryBrowser { last_page: self.last_page.clone() }))
    }
}

struct MemoryBrowser {
    last_page: Arc<Mutex<Option<MemoryPage>>>,
}

#[async_trait]
impl Browser for MemoryBrowser {
    async fn new_context(
        &self,
        _options: crate::driver::ContextOptions,
    ) -> Result<Box<dyn Context>, DriverError> {
        Ok(Box::new(MemoryContext { last_page: self.last_page.clone() }))
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

struct MemoryContext {
    last_page: Arc<Mutex<Option<MemoryPage>>>,
}

#[async_trait]
impl Context for MemoryContext {
    async fn new_page(&self) -> Result<Box<dyn Page>, DriverError> {
        let page = MemoryPage { state: Arc::new(Mutex::new(PageState::default())) };
        *self.last_page.lock().unwrap() = Some(page.clone());
        Ok(Box::new(page))
    }

    async fn set_default_timeout(&self, _timeout_ms: u32) {}
    async fn set_default_navigation_timeout(&self, _timeout_ms: u32) {}

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Handle used by tests to seed page/element state before exercising a
/// command against it.
#[derive(Clone)]
pub struct MemoryPage {
    state: Arc<Mutex<PageState>>,
}

impl MemoryPage {
    pub fn seed_elements(&self, selector: &str, elements: Vec<MemoryElement>) {
        self.state.lock().unwrap().elements.insert(selector.to_string(), elements);
    }

    pub fn register_navigation(&self, url: &str, final_url: &str, title: &str) {
        self.state
            .lock()
            .unwrap()
            .navigate_map
            .insert(url.to_string(), (final_url.to_string(), title.to_string()));
    }

    pub fn set_function_result(&self, js: &str, result: bool) {
        self.state.lock().unwrap().function_results.insert(js.to_string(), result);
    }

    pub fn current_url(&self) -> String {
        self.state.lock().unwrap().current_url.clone()
    }
}

#[async_trait]
impl Page for MemoryPage {
    async fn goto(
        &self,
        url: &str,
        _wait_until: WaitCondition,
        _timeout_ms: u32,
    ) -> Result<NavigateOutcome, DriverError> {
        let mut state = self.state.lock().unwrap();
        let (final_url, title) = state
            .navigate_map
            .get(url)
            .cloned()
            .unwrap_or_else(|| (url.to_string(), String::new()));
        state.current_url = final_url.clone();
        state.title = title;
        Ok(NavigateOutcome { final_url, status: Some(200) })
    }

    async fn url(&self) -> String {
        self.state.lock().unwrap().current_url.clone()
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().title.clone())
    }

    async fn set_extra_http_headers(&self, headers: HashMap<String, String>) -> Result<(), DriverError> {
        self.state.lock().unwrap().extra_headers.extend(headers);
        Ok(())
    }

    async fn wait_for_load_state(&self, _state: WaitCondition, _timeout_ms: u32) -> Result<(), DriverError> {
        Ok(())
    }

    async fn wait_for_function(
        &self,
        js: &str,
        timeout_ms: u32,
        polling_ms: u32,
    ) -> Result<(), DriverError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        loop {
            let satisfied = self.state.lock().unwrap().function_results.get(js).copied().unwrap_or(false);
            if satisfied {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout);
            }
            tokio::time::sleep(Duration::from_millis(polling_ms.max(1) as u64)).await;
        }
    }

    fn locator(&self, selector: &str) -> Box<dyn Locator> {
        Box::new(MemoryLocator { state: self.state.clone(), selector: selector.to_string() })
    }
}

struct MemoryLocator {
    state: Arc<Mutex<PageState>>,
    selector: String,
    index: usize,
}

impl MemoryLocator {
    fn elements(&self) -> Vec<MemoryElement> {
        self.state.lock().unwrap().elements.get(&self.selector).cloned().unwrap_or_default()
    }

    fn first(&self) -> Option<MemoryElement> {
        self.elements().into_iter().nth(self.index)
    }

    fn mutate_first(&self, f: impl FnOnce(&mut MemoryElement)) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        let list = state.elements.get_mut(&self.selector).ok_or_else(|| DriverError::other("no element"))?;
        let el = list.get_mut(self.index).ok_or_else(|| DriverError::other("no element"))?;
        f(el);
        Ok(())
    }

    fn state_satisfied(&self, target: ElementState) -> bool {
        let els = self.elements();
        match target {
            ElementState::Attached => els.len() > self.index,
            ElementState::Detached => els.len() <= self.index,
            ElementState::Visible => els.get(self.index).is_some_and(|e| e.visible),
            ElementState::Hidden => els.get(self.index).is_none_or(|e| !e.visible),
        }
    }
}

#[async_trait]
impl Locator for MemoryLocator {
    fn nth(&self, index: usize) -> Box<dyn Locator> {
        Box::new(MemoryLocator { state: self.state.clone(), selector: self.selector.clone(), index })
    }

    async fn count(&self) -> Result<usize, DriverError> {
        Ok(self.elements().len())
    }

    async fn wait_for(&self, state: ElementState, timeout_ms: u32) -> Result<(), DriverError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        loop {
            if self.state_satisfied(state) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn bounding_box(&self) -> Result<Option<BoundingBox>, DriverError> {
        Ok(self.first().and_then(|e| e.bounding_box))
    }

    async fn is_visible(&self) -> Result<bool, DriverError> {
        Ok(self.first().is_some_and(|e| e.visible))
    }

    async fn tag_name(&self) -> Result<String, DriverError> {
        self.first().map(|e| e.tag).ok_or_else(|| DriverError::other("no element"))
    }

    async fn text_content(&self) -> Result<Option<String>, DriverError> {
        Ok(self.first().map(|e| e.text))
    }

    async fn inner_html(&self) -> Result<String, DriverError> {
        self.first().map(|e| e.html).ok_or_else(|| DriverError::other("no element"))
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self.first().and_then(|e| e.attributes.get(name).cloned()))
    }

    async fn input_value(&self) -> Result<String, DriverError> {
        self.first().map(|e| e.value).ok_or_else(|| DriverError::other("no element"))
    }

    async fn clear(&self) -> Result<(), DriverError> {
        self.mutate_first(|e| e.value.clear())
    }

    async fn fill(&self, text: &str) -> Result<(), DriverError> {
        self.mutate_first(|e| e.value = text.to_string())
    }

    async fn type_text(&self, text: &str, _delay_ms: u32) -> Result<(), DriverError> {
        self.mutate_first(|e| e.value.push_str(text))
    }

    async fn press(&self, _key: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn click(&self, _options: ClickOptions) -> Result<(), DriverError> {
        if self.first().is_none() {
            return Err(DriverError::other("no element"));
        }
        Ok(())
    }

    async fn evaluate(&self, js: &str) -> Result<serde_json::Value, DriverError> {
        let property = js.strip_prefix("el => el.").unwrap_or(js);
        Ok(self
            .first()
            .and_then(|e| e.properties.get(property).cloned())
            .unwrap_or(serde_json::Value::Null))
    }
}
