//! One control per rendered widget descriptor.
//!
//! Controls only report raw input; the server decides the value on the
//! next render pass.

use base64::Engine as _;
use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::types::{
    AssistedInput, Control, FileInput, Notice, NoticeLevel, RenderedWidget, ResolveMode, UploadPayload,
    WidgetInput,
};

pub type InputCallback = Callback<(String, WidgetInput)>;

#[component]
pub fn NoticeLine(notice: Notice) -> impl IntoView {
    let class = match notice.level {
        NoticeLevel::Info => "p-2 text-sm rounded bg-blue-50 text-blue-800",
        NoticeLevel::Success => "p-2 text-sm rounded bg-green-50 text-green-800",
        NoticeLevel::Warning => "p-2 text-sm rounded bg-yellow-50 text-yellow-800",
        NoticeLevel::Error => "p-2 text-sm rounded bg-red-50 text-red-800",
    };
    view! { <div class=class>{notice.message}</div> }
}

#[component]
pub fn WidgetView(widget: RenderedWidget, on_input: InputCallback) -> impl IntoView {
    let field = widget.field.clone();
    let text = widget.text.clone().unwrap_or_default();
    let notices = widget.notices.clone();

    let control = match widget.control.clone() {
        Control::Select { options, selected } => {
            let field = field.clone();
            view! {
                <select
                    class="w-full px-3 py-2 border rounded"
                    on:change=move |ev| on_input.run((field.clone(), WidgetInput::Choice(event_target_value(&ev))))
                >
                    {options.into_iter().enumerate().map(|(i, option)| view! {
                        <option value=option.clone() selected=i == selected>{option.clone()}</option>
                    }).collect::<Vec<_>>()}
                </select>
            }.into_any()
        }
        Control::Toggle => {
            let field = field.clone();
            let checked = widget.value.as_bool().unwrap_or(false);
            view! {
                <input
                    type="checkbox"
                    class="h-4 w-4"
                    prop:checked=checked
                    on:change=move |ev| on_input.run((field.clone(), WidgetInput::Bool(event_target_checked(&ev))))
                />
            }.into_any()
        }
        Control::Integer { step } => {
            let field = field.clone();
            let value = widget.value.as_i64().unwrap_or(0).to_string();
            view! {
                <input
                    type="number"
                    step=step.to_string()
                    class="w-full px-3 py-2 border rounded"
                    prop:value=value
                    on:change=move |ev| {
                        if let Ok(v) = event_target_value(&ev).parse::<i64>() {
                            on_input.run((field.clone(), WidgetInput::Integer(v)));
                        }
                    }
                />
            }.into_any()
        }
        Control::Float { step, .. } => {
            let field = field.clone();
            view! {
                <input
                    type="number"
                    step=step.to_string()
                    class="w-full px-3 py-2 border rounded"
                    prop:value=text.clone()
                    on:change=move |ev| {
                        if let Ok(v) = event_target_value(&ev).parse::<f64>() {
                            on_input.run((field.clone(), WidgetInput::Float(v)));
                        }
                    }
                />
            }.into_any()
        }
        Control::NumberList { .. } | Control::Text { .. } => {
            let field = field.clone();
            let placeholder = match &widget.control {
                Control::Text { placeholder } => placeholder.clone(),
                _ => "e.g. 4, 4, 4".to_string(),
            };
            view! {
                <input
                    type="text"
                    class="w-full px-3 py-2 border rounded"
                    placeholder=placeholder
                    prop:value=text.clone()
                    on:change=move |ev| on_input.run((field.clone(), WidgetInput::Text(event_target_value(&ev))))
                />
            }.into_any()
        }
        Control::StructuredText { .. } | Control::ComplexText => {
            let field = field.clone();
            view! {
                <textarea
                    class="w-full px-3 py-2 border rounded font-mono text-sm"
                    rows="4"
                    prop:value=text.clone()
                    on:change=move |ev| on_input.run((field.clone(), WidgetInput::Text(event_target_value(&ev))))
                ></textarea>
            }.into_any()
        }
        Control::FilePicker { existing, selected, mode } => {
            view! { <FilePicker field=field.clone() existing=existing selected=selected mode=mode on_input=on_input/> }.into_any()
        }
        Control::AssistedText { presets, preset, format, hint, placeholder, feedback } => {
            let field_for_preset = field.clone();
            let field_for_text = field.clone();
            view! {
                <div class="space-y-2">
                    <select
                        class="w-full px-3 py-2 border rounded"
                        on:change=move |ev| {
                            let label = event_target_value(&ev);
                            let preset = (!label.is_empty()).then_some(label);
                            on_input.run((field_for_preset.clone(), WidgetInput::Assisted(AssistedInput { preset, text: None })));
                        }
                    >
                        <option value="" selected=preset.is_none()>"(none)"</option>
                        {presets.into_iter().map(|p| {
                            let is_selected = preset.as_deref() == Some(p.label.as_str());
                            view! { <option value=p.label.clone() selected=is_selected>{p.label.clone()}</option> }
                        }).collect::<Vec<_>>()}
                    </select>
                    <input
                        type="text"
                        class="w-full px-3 py-2 border rounded"
                        placeholder=placeholder
                        prop:value=text.clone()
                        on:change=move |ev| {
                            let text = Some(event_target_value(&ev));
                            on_input.run((field_for_text.clone(), WidgetInput::Assisted(AssistedInput { preset: None, text })));
                        }
                    />
                    <p class="text-xs text-gray-500">{format!("Format: {} · {}", format, hint)}</p>
                    {feedback.map(|f| {
                        let class = if f.valid { "text-xs text-green-700" } else { "text-xs text-yellow-700" };
                        view! { <p class=class>{f.message}</p> }
                    })}
                </div>
            }.into_any()
        }
    };

    view! {
        <div class="mb-4">
            <label class="block text-sm font-medium text-gray-700 mb-1">{widget.label.clone()}</label>
            {control}
            {widget.help.clone().map(|help| view! { <p class="text-xs text-gray-500 mt-1">{help}</p> })}
            <div class="mt-1 space-y-1">
                {notices.into_iter().map(|notice| view! { <NoticeLine notice=notice/> }).collect::<Vec<_>>()}
            </div>
        </div>
    }
}

#[component]
fn FilePicker(
    field: String,
    existing: Vec<String>,
    selected: Option<String>,
    mode: ResolveMode,
    on_input: InputCallback,
) -> impl IntoView {
    let field_for_select = field.clone();
    let selected_for_upload = selected.clone();
    let (reading, set_reading) = signal(false);

    let on_upload = move |ev: leptos::ev::Event| {
        let Some(input) = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            return;
        };
        let Some(file) = input.files().and_then(|files| files.get(0)) else {
            return;
        };
        let field = field.clone();
        let selected = selected_for_upload.clone();
        set_reading.set(true);
        wasm_bindgen_futures::spawn_local(async move {
            match read_upload(file).await {
                Ok(upload) => on_input.run((
                    field,
                    WidgetInput::File(FileInput { selected, upload: Some(upload), last: ResolveMode::Upload }),
                )),
                Err(e) => log::error!("Failed to read upload: {}", e),
            }
            set_reading.set(false);
        });
    };

    view! {
        <div class="grid grid-cols-2 gap-2">
            <select
                class="px-3 py-2 border rounded"
                on:change=move |ev| {
                    let name = event_target_value(&ev);
                    let selected = (!name.is_empty()).then_some(name);
                    on_input.run((
                        field_for_select.clone(),
                        WidgetInput::File(FileInput { selected, upload: None, last: ResolveMode::Existing }),
                    ));
                }
            >
                <option value="" selected=selected.is_none()>"(none)"</option>
                {existing.into_iter().map(|name| {
                    let is_selected = selected.as_deref() == Some(name.as_str());
                    view! { <option value=name.clone() selected=is_selected>{name.clone()}</option> }
                }).collect::<Vec<_>>()}
            </select>
            <div>
                <input type="file" class="text-sm" on:change=on_upload/>
                {move || reading.get().then(|| view! { <span class="text-xs text-gray-500">"Reading..."</span> })}
                {(mode == ResolveMode::Upload).then(|| view! { <span class="text-xs text-gray-500">"Using upload"</span> })}
            </div>
        </div>
    }
}

async fn read_upload(file: web_sys::File) -> Result<UploadPayload, String> {
    let buffer = wasm_bindgen_futures::JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| format!("{:?}", e))?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    Ok(UploadPayload {
        name: file.name(),
        content_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
    })
}
