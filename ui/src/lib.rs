use leptos::prelude::*;

mod api;
mod components;
mod types;

use components::chat::ChatPanel;
use components::operation_form::OperationForm;
use components::sidebar::Sidebar;
use components::visualizer::Visualizer;
use types::{OperationSummary, SessionSummary};

const SESSION_KEY: &str = "masgent_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Tools,
    Chat,
    Visualizer,
}

#[component]
pub fn App() -> impl IntoView {
    let session = RwSignal::new(Option::<SessionSummary>::None);
    let (load_error, set_load_error) = signal(Option::<String>::None);
    let selected = RwSignal::new(Option::<OperationSummary>::None);
    let mode = RwSignal::new(Mode::Tools);

    let config = LocalResource::new(|| async move { api::get_client_config().await.ok() });
    let categories = LocalResource::new(|| async move { api::list_operations().await.ok() });

    wasm_bindgen_futures::spawn_local(async move {
        match restore_session().await {
            Ok(restored) => {
                if let Some(storage) = local_storage() {
                    let _ = storage.set_item(SESSION_KEY, &restored.id);
                }
                session.set(Some(restored));
            }
            Err(e) => set_load_error.set(Some(e)),
        }
    });

    let refresh = Callback::new(move |_: ()| {
        let Some(id) = session.with_untracked(|s| s.as_ref().map(|s| s.id.clone())) else {
            return;
        };
        wasm_bindgen_futures::spawn_local(async move {
            match api::get_session(&id).await {
                Ok(updated) => session.set(Some(updated)),
                Err(e) => log::warn!("Failed to refresh session: {}", e),
            }
        });
    });

    // Views keyed on these only rebuild when the session itself changes,
    // not when its file list does.
    let session_id = Memo::new(move |_| session.with(|s| s.as_ref().map(|s| s.id.clone())));
    let files = Signal::derive(move || session.with(|s| s.as_ref().map(|s| s.files.clone()).unwrap_or_default()));
    let gemini_set = Signal::derive(move || session.with(|s| s.as_ref().map(|s| s.credentials.gemini).unwrap_or(false)));

    view! {
        <div class="flex h-screen bg-gray-100">
            {move || session.get().map(|current| {
                let file_limit = config.get().flatten().map(|c| c.ui.sidebar_file_limit).unwrap_or(10);
                let categories = categories.get().flatten().unwrap_or_default();
                view! {
                    <Sidebar
                        session=current
                        file_limit=file_limit
                        categories=categories
                        selected=selected
                        mode=mode
                        on_refresh=refresh
                    />
                }
            })}

            <div class="flex-1 overflow-y-auto p-6">
                {move || {
                    let Some(id) = session_id.get() else {
                        return match load_error.get() {
                            Some(e) => view! {
                                <div class="bg-red-50 border border-red-200 rounded-lg p-4 text-red-800">
                                    {format!("Failed to start a session: {}", e)}
                                </div>
                            }.into_any(),
                            None => view! { <div class="text-gray-500">"Starting session..."</div> }.into_any(),
                        };
                    };
                    match mode.get() {
                        Mode::Tools => match selected.get() {
                            Some(operation) => view! {
                                <OperationForm session_id=id operation=operation on_files_changed=refresh/>
                            }.into_any(),
                            None => view! { <Welcome/> }.into_any(),
                        },
                        Mode::Chat => view! {
                            <ChatPanel session_id=id gemini_set=gemini_set on_files_changed=refresh/>
                        }.into_any(),
                        Mode::Visualizer => view! { <Visualizer session_id=id files=files/> }.into_any(),
                    }
                }}
            </div>
        </div>
    }
}

#[component]
fn Welcome() -> impl IntoView {
    view! {
        <div class="max-w-2xl">
            <h2 class="text-2xl font-bold mb-2">"Welcome to Masgent"</h2>
            <p class="text-gray-600">
                "Pick a tool from the sidebar to build its input form, switch to Chat to describe a task in plain language, "
                "or open the Visualizer to inspect structures in this session."
            </p>
        </div>
    }
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

/// Reuses the session remembered by this browser, or starts a new one.
async fn restore_session() -> Result<SessionSummary, String> {
    let remembered = local_storage().and_then(|s| s.get_item(SESSION_KEY).ok().flatten());
    if let Some(id) = remembered {
        match api::get_session(&id).await {
            Ok(existing) => return Ok(existing),
            Err(e) => log::warn!("Stored session {} unavailable: {}", id, e),
        }
    }
    api::create_session().await
}

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    leptos::mount::mount_to_body(App);
}
