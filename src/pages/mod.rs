use crate::autosave::{use_entry_autosave, SaveStatus};
use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription,
    CardHeader, CardTitle, Label, Spinner, Textarea,
};
use crate::models::{Entity, Entry};
use crate::state::AppContext;
use crate::tags::extract_hashtags;
use crate::util::format_timestamp_local;
use leptos::prelude::*;
use leptos_router::hooks::use_params;
use leptos_router::params::Params;

const PREVIEW_CHARS: usize = 80;

#[derive(Params, PartialEq, Clone, Debug)]
pub struct EntryRouteParams {
    pub entry_id: Option<String>,
}

/// First non-empty line of `notes`, cut to `max_chars`.
pub(crate) fn notes_preview(notes: &str, max_chars: usize) -> String {
    let line = notes
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

fn entity_name(entities: &[Entity], entity_id: &str) -> String {
    entities
        .iter()
        .find(|e| e.id == entity_id)
        .map(|e| e.name.clone())
        .unwrap_or_else(|| entity_id.to_string())
}

fn status_class(status: SaveStatus) -> &'static str {
    match status {
        SaveStatus::Idle => "text-muted-foreground",
        SaveStatus::Dirty => "text-muted-foreground",
        SaveStatus::Saving => "text-muted-foreground animate-pulse",
        SaveStatus::Saved => "text-success",
        SaveStatus::Error => "text-destructive",
    }
}

/// Status to show: an idle session that still holds unsaved edits (for
/// example once a failure has faded) reads as dirty.
fn shown_status(status: SaveStatus, unsaved: bool) -> SaveStatus {
    if status == SaveStatus::Idle && unsaved {
        SaveStatus::Dirty
    } else {
        status
    }
}

fn save_disabled(status: SaveStatus, unsaved: bool) -> bool {
    !unsaved || status == SaveStatus::Saving
}

#[component]
pub fn NoticeList() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let notices = app_state.0.notices;

    view! {
        <Show when=move || !notices.get().is_empty() fallback=|| ().into_view()>
            <div class="fixed bottom-4 right-4 z-50 flex w-80 flex-col gap-2">
                {
                    let app_state = app_state.clone();
                    move || {
                        let app_state = app_state.clone();
                        notices
                            .get()
                            .into_iter()
                            .enumerate()
                            .map(move |(idx, msg)| {
                                let app_state = app_state.clone();
                                view! {
                                    <Alert class="border-destructive/30 bg-background shadow-sm">
                                        <div class="flex items-start justify-between gap-2">
                                            <AlertDescription class="text-destructive text-xs">
                                                {msg}
                                            </AlertDescription>
                                            <button
                                                class="text-xs text-muted-foreground hover:text-foreground"
                                                on:click=move |_| app_state.0.dismiss_notice(idx)
                                            >
                                                "Dismiss"
                                            </button>
                                        </div>
                                    </Alert>
                                }
                            })
                            .collect_view()
                    }
                }
            </div>
        </Show>
    }
}

#[component]
pub fn EntriesPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let entries = app_state.0.entry_list;
    let entities = app_state.0.entities;
    let loading = app_state.0.entries_loading;
    let error = app_state.0.entries_error;

    {
        let app_state = app_state.clone();
        Effect::new(move |_| app_state.0.refresh_entries());
    }

    let refresh = {
        let app_state = app_state.clone();
        move |_| app_state.0.refresh_entries()
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex w-full max-w-2xl flex-col gap-4 px-4 py-8">
                <div class="flex items-center justify-between">
                    <h1 class="text-lg font-semibold">"Journal"</h1>
                    <Button
                        variant=ButtonVariant::Outline
                        size=ButtonSize::Sm
                        on:click=refresh
                        attr:disabled=move || loading.get()
                    >
                        <span class="inline-flex items-center gap-2">
                            <Show when=move || loading.get() fallback=|| ().into_view()>
                                <Spinner />
                            </Show>
                            "Refresh"
                        </span>
                    </Button>
                </div>

                <Show when=move || error.get().is_some() fallback=|| ().into_view()>
                    {move || {
                        error.get().map(|e| {
                            view! {
                                <Alert class="border-destructive/30">
                                    <AlertDescription class="text-destructive text-xs">
                                        {e}
                                    </AlertDescription>
                                </Alert>
                            }
                        })
                    }}
                </Show>

                <Show
                    when=move || !entries.get().is_empty()
                    fallback=move || {
                        view! {
                            <div class="px-1 py-8 text-xs text-muted-foreground">
                                {move || if loading.get() { "Loading entries…" } else { "No entries yet." }}
                            </div>
                        }
                    }
                >
                    <ul class="flex flex-col gap-2">
                        {move || {
                            let entities = entities.get();
                            entries
                                .get()
                                .into_iter()
                                .map(|entry| entry_row(&entry, &entities))
                                .collect_view()
                        }}
                    </ul>
                </Show>
            </div>
            <NoticeList />
        </div>
    }
}

fn entry_row(entry: &Entry, entities: &[Entity]) -> impl IntoView {
    let href = format!("/entries/{}", entry.id);
    let title = entity_name(entities, &entry.entity_id);
    let when = format_timestamp_local(entry.timestamp);
    let preview = notes_preview(&entry.notes, PREVIEW_CHARS);

    view! {
        <li>
            <a
                href=href
                class="flex flex-col gap-1 rounded-md border px-3 py-2 hover:bg-accent"
            >
                <div class="flex items-center justify-between text-sm">
                    <span class="font-medium">{title}</span>
                    <span class="text-xs text-muted-foreground">{when}</span>
                </div>
                {(!preview.is_empty()).then(|| {
                    view! { <div class="truncate text-xs text-muted-foreground">{preview}</div> }
                })}
            </a>
        </li>
    }
}

#[component]
pub fn EntryPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let params = use_params::<EntryRouteParams>();
    let entry_id = Signal::derive(move || params.get().ok().and_then(|p| p.entry_id));

    let autosave = use_entry_autosave(entry_id);
    let status = autosave.status;
    let unsaved = autosave.unsaved;
    let shown = move || shown_status(status.get(), unsaved.get());
    let tags = Memo::new(move |_| extract_hashtags(&autosave.content.get()));

    let entries = app_state.0.entry_list;
    let entities = app_state.0.entities;
    let heading = move || {
        let id = entry_id.get().unwrap_or_default();
        entries
            .get()
            .into_iter()
            .find(|e| e.id == id)
            .map(|e| {
                (
                    entity_name(&entities.get(), &e.entity_id),
                    format_timestamp_local(e.timestamp),
                )
            })
    };

    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        if (ev.ctrl_key() || ev.meta_key()) && ev.key().eq_ignore_ascii_case("s") {
            ev.prevent_default();
            autosave.save();
        }
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex w-full max-w-2xl flex-col gap-4 px-4 py-8">
                <a href="/" class="text-xs text-muted-foreground hover:text-foreground">"← All entries"</a>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">
                            {move || heading().map(|(name, _)| name).unwrap_or_else(|| "Entry".to_string())}
                        </CardTitle>
                        <CardDescription class="text-xs">
                            {move || heading().map(|(_, when)| when).unwrap_or_default()}
                        </CardDescription>
                    </CardHeader>

                    <CardContent>
                        <div class="flex flex-col gap-2" on:keydown=on_keydown>
                            <div class="flex items-center justify-between">
                                <Label html_for="entry-notes" class="text-xs">"Notes"</Label>
                                <span
                                    data-name="SaveStatus"
                                    class=move || format!("text-xs {}", status_class(shown()))
                                >
                                    {move || shown().label()}
                                </span>
                            </div>

                            <Show when=move || autosave.loading.get() fallback=|| ().into_view()>
                                <div class="flex items-center gap-2 text-xs text-muted-foreground">
                                    <Spinner />
                                    "Loading…"
                                </div>
                            </Show>

                            <Textarea
                                id="entry-notes"
                                placeholder="Write something… #tags are picked up as you type"
                                value=autosave.content
                                disabled=autosave.loading
                                on_input=Callback::new(move |v: String| autosave.on_input(v))
                            />

                            <div class="flex items-center justify-between gap-2">
                                <div class="flex flex-wrap gap-1">
                                    {move || {
                                        tags.get()
                                            .into_iter()
                                            .map(|t| {
                                                view! {
                                                    <span class="rounded-full bg-secondary px-2 py-0.5 text-xs text-secondary-foreground">
                                                        {format!("#{t}")}
                                                    </span>
                                                }
                                            })
                                            .collect_view()
                                    }}
                                </div>
                                <Button
                                    size=ButtonSize::Sm
                                    on:click=move |_| autosave.save()
                                    attr:disabled=move || save_disabled(status.get(), unsaved.get())
                                >
                                    "Save"
                                </Button>
                            </div>
                        </div>
                    </CardContent>
                </Card>
            </div>
            <NoticeList />
        </div>
    }
}
